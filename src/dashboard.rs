// The dashboard's view catalog and per-tab evaluation.
//
// Each `ChartView` pairs an aggregation with the chart kind the
// presentation layer should draw it as. The engine never looks at the
// chart kind.
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::aggregate::{self, AggregationSpec, Completion, PercentageBase, PivotTable, ShapedResult};
use crate::dataset::{Dataset, DatasetView};
use crate::error::Result;
use crate::filter::FilterContext;
use crate::region::{complete_regions, RegionCompletion, RegionResolver};
use crate::types::{Column, OverviewMetrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Tab {
    #[strum(to_string = "Overview")]
    Overview,
    #[strum(to_string = "Temporal Analysis")]
    Temporal,
    #[strum(to_string = "Geographic Analysis")]
    Geographic,
    #[strum(to_string = "Industry Analysis")]
    Industry,
    #[strum(to_string = "Demographic Analysis")]
    Demographic,
    #[strum(to_string = "Risk Analysis")]
    Risk,
    #[strum(to_string = "Key Findings and Conclusions")]
    Conclusions,
}

impl Tab {
    /// File name prefix for this tab's exports.
    pub fn slug(self) -> &'static str {
        match self {
            Tab::Overview => "overview",
            Tab::Temporal => "temporal",
            Tab::Geographic => "geographic",
            Tab::Industry => "industry",
            Tab::Demographic => "demographic",
            Tab::Risk => "risk",
            Tab::Conclusions => "conclusions",
        }
    }
}

/// Rendering hint for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ChartKind {
    Bar,
    Pie,
    Donut,
    Line,
    GroupedBar,
    StackedBar,
    Heatmap,
    Treemap,
    Sunburst,
    Choropleth,
    ParallelCategories,
    Markdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewKind {
    Table(AggregationSpec),
    /// Observed key paths over 2-3 columns, nested for treemaps and
    /// sunbursts.
    Hierarchy(Vec<Column>),
    Pivot { row: Column, column: Column },
    /// State counts completed against every known region.
    Regions,
    Markdown(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartView {
    pub id: &'static str,
    pub tab: Tab,
    pub title: &'static str,
    pub chart: ChartKind,
    pub kind: ViewKind,
    /// Append the active filter caption to the title.
    pub captioned: bool,
    /// Reading notes shown under the chart.
    pub note: Option<&'static str>,
}

impl ChartView {
    fn new(
        tab: Tab,
        id: &'static str,
        title: &'static str,
        chart: ChartKind,
        kind: ViewKind,
    ) -> Self {
        Self {
            id,
            tab,
            title,
            chart,
            kind,
            captioned: false,
            note: None,
        }
    }

    fn table(
        tab: Tab,
        id: &'static str,
        title: &'static str,
        chart: ChartKind,
        spec: AggregationSpec,
    ) -> Self {
        Self::new(tab, id, title, chart, ViewKind::Table(spec))
    }

    fn nested(
        tab: Tab,
        id: &'static str,
        title: &'static str,
        chart: ChartKind,
        columns: &[Column],
    ) -> Self {
        Self::new(tab, id, title, chart, ViewKind::Hierarchy(columns.to_vec()))
    }

    fn captioned(mut self) -> Self {
        self.captioned = true;
        self
    }

    fn with_note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }

    pub fn title_for(&self, filters: &FilterContext) -> String {
        if self.captioned {
            format!("{}{}", self.title, filters.caption())
        } else {
            self.title.to_string()
        }
    }
}

const TEMPORAL_FINDINGS: &str = "\
- Peak accident periods identified
- Shift and day patterns revealed
- Seasonal variations in accident frequency
- Yearly trends in accident severity";

const GEOGRAPHIC_FINDINGS: &str = "\
- High-risk states identified
- State-industry combinations with most accidents
- Local areas needing safety interventions";

const INDUSTRY_FINDINGS: &str = "\
- Industry-specific risk patterns identified
- Critical risks in each sector
- Safety gear compliance by industry";

const DEMOGRAPHIC_FINDINGS: &str = "\
- Age and gender patterns in accidents
- Employee type specific risks";

const RISK_FINDINGS: &str = "\
- Critical risk factors identified
- Safety gear effectiveness analyzed
- Risk mitigation strategies suggested";

const RECOMMENDATIONS: &str = "\
1. Implement targeted safety programs for high-risk industries
2. Focus on peak periods and shifts with most accidents
3. Enhance safety gear compliance in identified sectors
4. Develop age and experience-specific training programs
5. Prioritize resources based on accident concentration
6. Regular safety audits in high-risk areas
7. Continuous monitoring of safety measures effectiveness";

/// Every view of the dashboard in display order.
pub fn catalog() -> Vec<ChartView> {
    use ChartKind::*;
    use Column::*;
    use Tab::*;

    let freq = AggregationSpec::frequency;
    let hier = AggregationSpec::hierarchy;
    let share = |c: Column| {
        AggregationSpec::frequency(c).with_percentage(PercentageBase::GrandTotal)
    };
    let share_within = |columns: &[Column]| {
        AggregationSpec::hierarchy(columns)
            .with_percentage(PercentageBase::PerGroup { by: columns[0] })
    };

    vec![
        // Overview
        ChartView::table(Overview, "year", "Trend of Accidents Over Years", Bar, freq(Year)),
        ChartView::table(
            Overview,
            "day_of_week",
            "Distribution of Accidents by Day of Week",
            Pie,
            freq(DayOfWeek),
        ),
        ChartView::table(Overview, "shift", "Accidents Distribution by Shift", Bar, freq(Shift)),
        ChartView::new(
            Overview,
            "state_map",
            "Accidents Distribution by State",
            Choropleth,
            ViewKind::Regions,
        ),
        ChartView::table(
            Overview,
            "industry_sector",
            "Accidents Distribution by Industry Sector",
            Bar,
            freq(IndustrySector),
        ),
        ChartView::table(
            Overview,
            "severity",
            "Distribution of Accident Severity",
            Donut,
            freq(Severity),
        ),
        ChartView::table(
            Overview,
            "accident_type",
            "Distribution of Accident Types",
            Bar,
            freq(AccidentType),
        ),
        ChartView::table(Overview, "gender", "Gender Distribution in Accidents", Pie, freq(Gender)),
        ChartView::table(
            Overview,
            "age_range",
            "Age Distribution of Accidents (Working Age)",
            Bar,
            freq(AgeRange).with_completion(Completion::CompleteWithZero),
        ),
        ChartView::table(
            Overview,
            "employee_type",
            "Accidents by Employee Type",
            Bar,
            freq(EmployeeType),
        ),
        ChartView::table(
            Overview,
            "critical_risk",
            "Distribution of Critical Risks",
            Bar,
            freq(CriticalRisk),
        ),
        ChartView::table(
            Overview,
            "safety_gear",
            "Safety Gear Usage in Accidents",
            Donut,
            share(SafetyGear),
        ),
        // Temporal
        ChartView::new(
            Temporal,
            "year_month",
            "Accident Frequency Heatmap by Year and Month",
            Heatmap,
            ViewKind::Pivot { row: Year, column: Month },
        )
        .with_note(
            "- Identifies seasonal patterns in accidents\n\
             - Shows peak months for industrial accidents\n\
             - Helps in planning preventive measures during high-risk periods",
        ),
        ChartView::new(
            Temporal,
            "day_shift",
            "Accident Distribution by Day and Shift",
            Heatmap,
            ViewKind::Pivot { row: DayOfWeek, column: Shift },
        )
        .with_note(
            "- Reveals most dangerous shift-day combinations\n\
             - Helps in optimizing work schedules\n\
             - Identifies patterns in shift-related accidents",
        ),
        ChartView::table(
            Temporal,
            "hour_type",
            "Percentage Distribution of Accidents by Hour Type",
            Bar,
            share(HourType),
        )
        .with_note(
            "- Shows the percentage distribution of accidents across different hour types\n\
             - Percentages are calculated based on the currently filtered data\n\
             - Helps in understanding the relative risk of different work hour categories",
        ),
        ChartView::table(
            Temporal,
            "year_severity",
            "Trend of Accident Severity Over Years",
            Line,
            hier(&[Year, Severity]),
        )
        .with_note(
            "- Tracks changes in accident severity over time\n\
             - Shows effectiveness of safety measures\n\
             - Helps in evaluating safety program impact",
        ),
        ChartView::table(
            Temporal,
            "shift_severity",
            "Distribution of Accidents by Shift and Severity",
            GroupedBar,
            hier(&[Shift, Severity]),
        )
        .with_note(
            "- Shows the distribution of accident severity across different shifts\n\
             - Helps identify which shifts have higher proportions of severe accidents\n\
             - Useful for shift-specific safety planning",
        ),
        // Geographic
        ChartView::new(
            Geographic,
            "state_choropleth",
            "Accidents by State",
            Choropleth,
            ViewKind::Regions,
        ),
        ChartView::nested(
            Geographic,
            "state_sector",
            "Accident Distribution by State and Industry Sector",
            Treemap,
            &[State, IndustrySector],
        )
        .with_note(
            "- Shows concentration of accidents by state and sector\n\
             - Identifies high-risk state-industry combinations\n\
             - Helps in targeted safety interventions",
        ),
        ChartView::table(
            Geographic,
            "top_local",
            "Top 10 Local Areas with Most Accidents",
            Bar,
            freq(Local).with_limit(10),
        )
        .with_note(
            "- Identifies high-risk local areas\n\
             - Helps in local safety planning\n\
             - Shows concentration of accidents in specific regions",
        ),
        ChartView::nested(
            Geographic,
            "state_accident_type",
            "Accident Types Distribution by State",
            Sunburst,
            &[State, AccidentType],
        )
        .with_note(
            "- Shows prevalent accident types in each state\n\
             - Helps in state-specific safety planning\n\
             - Identifies regional patterns in accident types",
        ),
        ChartView::table(
            Geographic,
            "state_severity_share",
            "Severity Share Within Each State",
            StackedBar,
            share_within(&[State, Severity]),
        ),
        // Industry
        ChartView::nested(
            Industry,
            "sector_accident_type",
            "Accident Types Distribution by Industry Sector",
            Sunburst,
            &[IndustrySector, AccidentType],
        )
        .with_note(
            "- Shows prevalent accident types in each industry\n\
             - Helps in industry-specific safety planning\n\
             - Identifies sector-specific risk patterns",
        ),
        ChartView::nested(
            Industry,
            "sector_critical_risk",
            "Critical Risks Distribution by Industry Sector",
            Treemap,
            &[IndustrySector, CriticalRisk],
        )
        .with_note(
            "- Shows critical risks in each industry\n\
             - Helps in targeted risk mitigation\n\
             - Identifies industry-specific safety challenges",
        ),
        ChartView::table(
            Industry,
            "sector_safety_gear",
            "Safety Gear Usage by Industry Sector",
            GroupedBar,
            hier(&[IndustrySector, SafetyGear]),
        )
        .with_note(
            "- Shows safety gear compliance by industry\n\
             - Identifies industries needing safety gear enforcement\n\
             - Helps in safety equipment planning",
        ),
        // Demographic
        ChartView::table(
            Demographic,
            "gender",
            "Overall Gender Distribution in Accidents",
            Pie,
            freq(Gender),
        )
        .with_note(
            "- Shows the overall proportion of accidents by gender\n\
             - Helps understand gender distribution in industrial accidents\n\
             - Provides baseline for gender-specific safety analysis",
        ),
        ChartView::table(Demographic, "gender_share", "Gender Distribution", Bar, share(Gender))
            .captioned()
            .with_note(
                "- Shows gender distribution for the currently selected filters\n\
                 - Updates dynamically when state or severity filters change\n\
                 - Helps identify gender-specific patterns in different scenarios",
            ),
        ChartView::table(
            Demographic,
            "age_gender",
            "Accident Distribution by Age and Gender",
            GroupedBar,
            hier(&[AgeRange, Gender]),
        )
        .with_note(
            "- Shows age and gender patterns in accidents\n\
             - Identifies vulnerable demographic groups\n\
             - Helps in targeted safety training",
        ),
        ChartView::table(
            Demographic,
            "employee_type",
            "Accident Distribution by Employee Type",
            Bar,
            freq(EmployeeType),
        )
        .with_note(
            "- Shows accident patterns by employee type\n\
             - Identifies high-risk employee categories\n\
             - Helps in employee-specific safety planning",
        ),
        ChartView::table(
            Demographic,
            "age_accident_type",
            "Accident Types Distribution by Age",
            GroupedBar,
            hier(&[AgeRange, AccidentType]),
        )
        .with_note(
            "- Shows prevalent accident types by age group\n\
             - Helps in age-specific safety training\n\
             - Identifies age-related risk patterns",
        ),
        // Risk
        ChartView::nested(
            Risk,
            "severity_accident_type",
            "Distribution of Accident Types by Severity",
            Sunburst,
            &[Severity, AccidentType],
        )
        .with_note(
            "- Shows the distribution of different accident types by severity\n\
             - Helps identify which types of accidents are most severe\n\
             - Useful for prioritizing safety measures based on severity",
        ),
        ChartView::table(
            Risk,
            "safety_gear_severity",
            "Accident Severity Distribution with/without Safety Gear",
            GroupedBar,
            share_within(&[SafetyGear, Severity]),
        )
        .with_note(
            "- Shows the effectiveness of safety gear in preventing severe accidents\n\
             - Demonstrates the importance of safety equipment usage\n\
             - Helps in safety gear policy planning",
        ),
        ChartView::table(
            Risk,
            "severity_state_share",
            "State Share Within Each Severity",
            StackedBar,
            share_within(&[Severity, State]),
        ),
        ChartView::nested(
            Risk,
            "critical_risk_accident_type",
            "Accident Types by Critical Risk",
            Treemap,
            &[CriticalRisk, AccidentType],
        )
        .with_note(
            "- Shows which critical risks lead to which types of accidents\n\
             - Helps identify most dangerous risk factors\n\
             - Useful for targeted risk mitigation",
        ),
        ChartView::new(
            Risk,
            "time_risk",
            "Accident Frequency by Day and Shift",
            Heatmap,
            ViewKind::Pivot { row: Shift, column: DayOfWeek },
        )
        .with_note(
            "- Identifies high-risk time periods\n\
             - Shows patterns in accident occurrence\n\
             - Helps in shift planning and safety monitoring",
        ),
        ChartView::table(
            Risk,
            "age_severity",
            "Accident Severity Distribution by Age Group",
            StackedBar,
            hier(&[AgeRange, Severity]),
        )
        .with_note(
            "- Shows which age groups are most vulnerable to severe accidents\n\
             - Helps in age-specific safety training\n\
             - Useful for targeted safety measures",
        ),
        ChartView::nested(
            Risk,
            "risk_factors",
            "Multiple Risk Factor Analysis",
            ParallelCategories,
            &[IndustrySector, CriticalRisk, SafetyGear],
        )
        .with_note(
            "- Shows complex interactions between multiple risk factors\n\
             - Helps identify dangerous combinations of factors\n\
             - Useful for comprehensive risk management",
        ),
        // Conclusions
        ChartView::new(
            Conclusions,
            "temporal",
            "Temporal Patterns",
            Markdown,
            ViewKind::Markdown(TEMPORAL_FINDINGS),
        ),
        ChartView::new(
            Conclusions,
            "geographic",
            "Geographic Insights",
            Markdown,
            ViewKind::Markdown(GEOGRAPHIC_FINDINGS),
        ),
        ChartView::new(
            Conclusions,
            "industry",
            "Industry Analysis",
            Markdown,
            ViewKind::Markdown(INDUSTRY_FINDINGS),
        ),
        ChartView::new(
            Conclusions,
            "demographic",
            "Demographic Findings",
            Markdown,
            ViewKind::Markdown(DEMOGRAPHIC_FINDINGS),
        ),
        ChartView::new(
            Conclusions,
            "risk",
            "Risk Management",
            Markdown,
            ViewKind::Markdown(RISK_FINDINGS),
        ),
        ChartView::new(
            Conclusions,
            "recommendations",
            "Recommendations",
            Markdown,
            ViewKind::Markdown(RECOMMENDATIONS),
        ),
    ]
}

pub fn views_for(tab: Tab) -> Vec<ChartView> {
    catalog().into_iter().filter(|v| v.tab == tab).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelData {
    Table(ShapedResult),
    Pivot(PivotTable),
    Regions(RegionCompletion),
    Markdown(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub view: ChartView,
    pub title: String,
    pub data: PanelData,
}

/// Headline numbers shown above the overview charts.
pub fn overview_metrics(view: &DatasetView<'_>) -> Result<OverviewMetrics> {
    Ok(OverviewMetrics {
        total_accidents: view.len(),
        total_states: view.distinct_count(Column::State)?,
        total_industry_sectors: view.distinct_count(Column::IndustrySector)?,
    })
}

/// Evaluate every view of `tab` against the filtered dataset.
pub fn render_tab(
    dataset: &Dataset,
    filters: &FilterContext,
    regions: &RegionResolver,
    tab: Tab,
) -> Result<Vec<Panel>> {
    let full = dataset.view();
    let view = filters.apply(&full);
    let mut panels = Vec::new();

    for chart in views_for(tab) {
        let data = match &chart.kind {
            ViewKind::Table(spec) => PanelData::Table(aggregate::shape(&view, spec)?),
            ViewKind::Hierarchy(columns) => {
                PanelData::Table(aggregate::hierarchy(&view, columns)?)
            }
            ViewKind::Pivot { row, column } => {
                PanelData::Pivot(aggregate::pivot(&view, *row, *column)?)
            }
            ViewKind::Regions => {
                let counts = aggregate::frequency(&view, Column::State)?;
                let reference = aggregate::frequency(&full, Column::State)?;
                PanelData::Regions(complete_regions(&counts, &reference, regions)?)
            }
            ViewKind::Markdown(text) => PanelData::Markdown(*text),
        };
        panels.push(Panel {
            title: chart.title_for(filters),
            view: chart,
            data,
        });
    }
    Ok(panels)
}

pub fn tabs() -> impl Iterator<Item = Tab> {
    Tab::iter()
}
