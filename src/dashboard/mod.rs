//! Dashboard controller.
//!
//! [`Dashboard`] owns the session state (selection, filters, current metric
//! and year range) and every rendered panel. Each `load_*` method fetches one
//! view, drops the response if a newer request for that view was issued in
//! the meantime, and applies it to the panel following the policy in
//! [`panel`].

pub mod panel;
pub mod sequence;
pub mod view;

pub use panel::{Applied, Panel};
pub use sequence::{RequestSequencer, View};
pub use view::*;

use crate::analysis::{distinct_provinces, search_counties, shape_county_list};
use crate::api::{CountyFilters, InterviewQuery, StatsClient, YearRange};
use crate::metric::Metric;
use crate::models::County;
use crate::selection::{Selection, SelectionError, Toggled};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

/// Reasons a comparison cannot be requested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompareError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("no trend data for metric '{0}'; use one of GDP, PerCapitaGDP, RuralDisposableIncome, AgriOutputValue")]
    UnsupportedMetric(Metric),
}

/// Stored filters for the interview list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterviewFilters {
    pub county_code: Option<String>,
    pub surveyor_id: Option<String>,
    pub keyword: Option<String>,
}

impl InterviewFilters {
    /// Build the request query. A non-blank quick keyword replaces every stored filter.
    pub fn query(&self, quick: Option<&str>, limit: usize) -> InterviewQuery {
        match quick.map(str::trim).filter(|k| !k.is_empty()) {
            Some(keyword) => InterviewQuery {
                keyword: Some(keyword.to_string()),
                limit,
                ..InterviewQuery::default()
            },
            None => InterviewQuery {
                county_code: self.county_code.clone(),
                surveyor_id: self.surveyor_id.clone(),
                keyword: self.keyword.clone(),
                limit,
            },
        }
    }
}

/// Session defaults, usually taken from the config file.
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub metric: Metric,
    pub range: YearRange,
    pub chart: ChartKind,
    pub fallback_year: i32,
    pub crop_year: i32,
    pub county_limit: usize,
    pub interview_limit: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            metric: Metric::Gdp,
            range: YearRange::new(2010, 2020),
            chart: ChartKind::Line,
            fallback_year: 2020,
            crop_year: 2020,
            county_limit: 12,
            interview_limit: 20,
        }
    }
}

/// Everything the session remembers between commands.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub selection: Selection,
    pub metric: Metric,
    pub range: YearRange,
    pub chart: ChartKind,
    /// Pinned breakdown year; the latest year with data when unset.
    pub breakdown_year: Option<i32>,
    pub crop_year: i32,
    pub county_filters: CountyFilters,
    pub county_search: Option<String>,
    pub interview_filters: InterviewFilters,

    pub overview: Panel<OverviewView>,
    pub provinces: Panel<Vec<String>>,
    pub counties: Panel<Vec<CountyCard>>,
    pub detail: Option<CountyDetailView>,
    pub interviews: Panel<Vec<InterviewCard>>,
    pub comparison: Panel<ComparisonView>,
}

impl DashboardState {
    fn new(settings: &DashboardSettings) -> Self {
        Self {
            selection: Selection::new(),
            metric: settings.metric,
            range: settings.range,
            chart: settings.chart,
            breakdown_year: None,
            crop_year: settings.crop_year,
            county_filters: CountyFilters::default(),
            county_search: None,
            interview_filters: InterviewFilters::default(),
            overview: Panel::Empty,
            provinces: Panel::Empty,
            counties: Panel::Empty,
            detail: None,
            interviews: Panel::Empty,
            comparison: Panel::Empty,
        }
    }
}

/// The dashboard session.
///
/// Shared between tasks behind an `Arc`. The state lock is never held across
/// a request, so a slow fetch never blocks other commands.
pub struct Dashboard {
    client: StatsClient,
    settings: DashboardSettings,
    sequencer: RequestSequencer,
    state: Mutex<DashboardState>,
}

impl Dashboard {
    pub fn new(client: StatsClient, settings: DashboardSettings) -> Self {
        let state = DashboardState::new(&settings);
        Self {
            client,
            settings,
            sequencer: RequestSequencer::new(),
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DashboardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state, for rendering.
    pub fn snapshot(&self) -> DashboardState {
        self.lock().clone()
    }

    /// Read the state without cloning it.
    pub fn with_state<R>(&self, f: impl FnOnce(&DashboardState) -> R) -> R {
        f(&self.lock())
    }

    // ---- selection and comparison parameters ----

    /// Add or remove a county. An empty name falls back to a name from the
    /// loaded county list, then to the code.
    pub fn toggle_county(&self, code: &str, name: Option<&str>) -> Result<Toggled, SelectionError> {
        let mut state = self.lock();
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from)
            .or_else(|| known_name(&state, code))
            .unwrap_or_else(|| code.to_string());
        let toggled = state.selection.toggle(code, &name)?;
        info!("{:?} {} ({} selected)", toggled, code, state.selection.len());
        Ok(toggled)
    }

    pub fn remove_county(&self, code: &str) -> bool {
        self.lock().selection.remove(code)
    }

    pub fn clear_selection(&self) {
        self.lock().selection.clear();
    }

    pub fn set_metric(&self, metric: Metric) {
        self.lock().metric = metric;
    }

    pub fn set_range(&self, range: YearRange) {
        self.lock().range = range;
    }

    pub fn set_chart(&self, chart: ChartKind) {
        self.lock().chart = chart;
    }

    pub fn set_breakdown_year(&self, year: Option<i32>) {
        self.lock().breakdown_year = year;
    }

    pub fn set_crop_year(&self, year: i32) {
        self.lock().crop_year = year;
    }

    pub fn set_interview_filters(&self, filters: InterviewFilters) {
        self.lock().interview_filters = filters;
    }

    pub fn reset_interview_filters(&self) {
        self.lock().interview_filters = InterviewFilters::default();
    }

    // ---- views ----

    pub async fn load_overview(&self) -> Applied {
        let token = self.sequencer.issue(View::Overview);
        let result = self.client.overview().await;
        let Some(result) = self.sequencer.accept(token, result) else {
            return Applied::Stale;
        };
        self.lock()
            .overview
            .apply("overview", result, OverviewView::from)
    }

    pub async fn load_provinces(&self) -> Applied {
        let token = self.sequencer.issue(View::Provinces);
        let result = self.client.counties(&CountyFilters::default()).await;
        let Some(result) = self.sequencer.accept(token, result) else {
            return Applied::Stale;
        };
        self.lock()
            .provinces
            .apply("provinces", result, |counties| distinct_provinces(&counties))
    }

    /// Load the county list. `search` narrows it locally before the display
    /// limit is applied.
    pub async fn load_counties(&self, filters: CountyFilters, search: Option<String>) -> Applied {
        {
            let mut state = self.lock();
            state.county_filters = filters.clone();
            state.county_search = search.clone();
        }

        let token = self.sequencer.issue(View::Counties);
        let result = self.client.counties(&filters).await;
        let Some(result) = self.sequencer.accept(token, result) else {
            return Applied::Stale;
        };

        let limit = self.settings.county_limit;
        self.lock().counties.apply("counties", result, |counties| {
            let matched: Vec<County> = match search.as_deref() {
                Some(keyword) => search_counties(&counties, keyword)
                    .into_iter()
                    .cloned()
                    .collect(),
                None => counties,
            };
            shape_county_list(matched, limit)
                .iter()
                .map(CountyCard::from)
                .collect()
        })
    }

    /// Load every part of one county's detail view concurrently.
    ///
    /// Each part is applied on its own, so one failing endpoint leaves the
    /// others intact. Re-opening the same county keeps parts that fail softly.
    pub async fn show_county_detail(&self, code: &str) -> Applied {
        let (range, crop_year, token) = {
            let state = self.lock();
            (state.range, state.crop_year, self.sequencer.issue(View::CountyDetail))
        };

        let (county, economy, agriculture, crops) = futures::join!(
            self.client.county(code),
            self.client.economy(code, range),
            self.client.agriculture(code, range),
            self.client.crops(code, crop_year),
        );
        let mut state = self.lock();
        if !self.sequencer.is_current(token) {
            debug!("Discarding stale detail for {}", code);
            return Applied::Stale;
        }

        let mut view = match state.detail.take() {
            Some(view) if view.code == code => view,
            _ => CountyDetailView::new(code),
        };

        let mut terrain_relief = None;
        let mut outcome = view.county.apply("county", county, |detail| {
            terrain_relief = detail.terrain_relief;
            CountyCard::from(&detail)
        });
        if outcome == Applied::Updated {
            view.terrain_relief = terrain_relief;
        }

        let name = view.title().to_string();
        outcome = outcome.merge(view.economy.apply("economy", economy, |rows| {
            ChartView::for_county(code, &name, rows, Metric::Gdp, ChartKind::Line)
        }));
        outcome = outcome.merge(view.agriculture.apply("agriculture", agriculture, |rows| {
            ChartView::for_county(code, &name, rows, Metric::GrainOutput, ChartKind::Bar)
        }));
        outcome = outcome.merge(
            view.crops
                .apply("crops", crops, |rows| CropShareView::from_rows(crop_year, &rows)),
        );

        state.detail = Some(view);
        outcome
    }

    /// Load interviews. A non-blank `quick` keyword is used instead of the
    /// stored filters.
    pub async fn load_interviews(&self, quick: Option<&str>) -> Applied {
        let (query, token) = {
            let state = self.lock();
            let query = state
                .interview_filters
                .query(quick, self.settings.interview_limit);
            (query, self.sequencer.issue(View::Interviews))
        };

        let result = self.client.interviews(&query).await;
        let mut state = self.lock();
        let Some(result) = self.sequencer.accept(token, result) else {
            return Applied::Stale;
        };
        state.interviews.apply("interviews", result, |rows| {
            rows.iter().map(InterviewCard::from).collect()
        })
    }

    /// Re-fetch the comparison for the current selection and metric.
    ///
    /// Validation happens before any request. Parameters are captured and the
    /// token issued under one lock, and the token is checked again under the
    /// lock that applies the result, so only the latest refresh lands.
    pub async fn refresh_comparison(&self) -> Result<Applied, CompareError> {
        let (request, codes, token) = {
            let state = self.lock();
            state.selection.ensure_comparable()?;
            if !state.metric.supports_trend() {
                return Err(CompareError::UnsupportedMetric(state.metric));
            }
            let request = ComparisonRequest {
                counties: state.selection.iter().cloned().collect(),
                metric: state.metric,
                range: state.range,
                chart: state.chart,
                year: state.breakdown_year,
                fallback_year: self.settings.fallback_year,
            };
            (
                request,
                state.selection.codes(),
                self.sequencer.issue(View::Comparison),
            )
        };

        let result = self
            .client
            .compare_trend(&codes, request.metric, request.range)
            .await;
        let mut state = self.lock();
        let Some(result) = self.sequencer.accept(token, result) else {
            return Ok(Applied::Stale);
        };

        Ok(state.comparison.apply("comparison", result, |rows| {
            ComparisonView::build(request, &rows)
        }))
    }
}

fn known_name(state: &DashboardState, code: &str) -> Option<String> {
    state
        .counties
        .ready()
        .and_then(|cards| cards.iter().find(|c| c.code == code))
        .map(|c| c.name.clone())
}
