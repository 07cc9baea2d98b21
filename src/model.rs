use eframe::egui;
use serde::{Deserialize, Serialize};

/// A domain-space anchor: epoch milliseconds on the time axis, price on the value axis.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnchorPoint {
    pub time_ms: i64,
    pub price: f64,
}

impl AnchorPoint {
    pub fn new(time_ms: i64, price: f64) -> Self {
        Self { time_ms, price }
    }

    pub fn is_finite(self) -> bool {
        self.price.is_finite()
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_color32(self) -> egui::Color32 {
        egui::Color32::from_rgba_unmultiplied(self.r, self.g, self.b, self.a)
    }

    pub fn from_color32(c: egui::Color32) -> Self {
        let [r, g, b, a] = c.to_srgba_unmultiplied();
        Self { r, g, b, a }
    }

    /// Scales the alpha channel by `opacity` (clamped to 0..=1).
    pub fn with_opacity(self, opacity: f32) -> Self {
        let opacity = if opacity.is_finite() {
            opacity.clamp(0.0, 1.0)
        } else {
            1.0
        };
        Self {
            a: (f32::from(self.a) * opacity).round() as u8,
            ..self
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrawingStyle {
    pub color: Rgba,
    pub width: f32,
    #[serde(default)]
    pub dash: LineStyle,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

fn default_opacity() -> f32 {
    1.0
}

impl Default for DrawingStyle {
    fn default() -> Self {
        Self {
            color: Rgba::rgb(41, 98, 255),
            width: 2.0,
            dash: LineStyle::Solid,
            opacity: 1.0,
        }
    }
}

impl DrawingStyle {
    pub fn stroke_color(&self) -> Rgba {
        self.color.with_opacity(self.opacity)
    }
}

/// Closed set of annotation kinds. Point counts and labels live in
/// [`crate::geometry::handler`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DrawingKind {
    HorizontalLine,
    HorizontalRay,
    VerticalLine,
    CrossLine,
    TrendLine,
    Ray,
    ExtendedLine,
    Channel,
    ParallelChannel,
    Rectangle,
    Ellipse,
    Triangle,
    Text,
    Callout,
    PriceRange,
    FibRetracement,
    FibExtension,
    FibTimeZones,
    Pitchfork,
    SchiffPitchfork,
    ModifiedSchiffPitchfork,
    ElliottWave,
    HeadAndShoulders,
    LongPosition,
    ShortPosition,
}

impl DrawingKind {
    pub const ALL: [DrawingKind; 25] = [
        DrawingKind::HorizontalLine,
        DrawingKind::HorizontalRay,
        DrawingKind::VerticalLine,
        DrawingKind::CrossLine,
        DrawingKind::TrendLine,
        DrawingKind::Ray,
        DrawingKind::ExtendedLine,
        DrawingKind::Channel,
        DrawingKind::ParallelChannel,
        DrawingKind::Rectangle,
        DrawingKind::Ellipse,
        DrawingKind::Triangle,
        DrawingKind::Text,
        DrawingKind::Callout,
        DrawingKind::PriceRange,
        DrawingKind::FibRetracement,
        DrawingKind::FibExtension,
        DrawingKind::FibTimeZones,
        DrawingKind::Pitchfork,
        DrawingKind::SchiffPitchfork,
        DrawingKind::ModifiedSchiffPitchfork,
        DrawingKind::ElliottWave,
        DrawingKind::HeadAndShoulders,
        DrawingKind::LongPosition,
        DrawingKind::ShortPosition,
    ];

    pub fn point_count(self) -> usize {
        crate::geometry::handler(self).labels.len()
    }

    pub fn has_fill(self) -> bool {
        crate::geometry::handler(self).fill
    }

    pub fn display_name(self) -> &'static str {
        match self {
            DrawingKind::HorizontalLine => "Horizontal line",
            DrawingKind::HorizontalRay => "Horizontal ray",
            DrawingKind::VerticalLine => "Vertical line",
            DrawingKind::CrossLine => "Cross line",
            DrawingKind::TrendLine => "Trend line",
            DrawingKind::Ray => "Ray",
            DrawingKind::ExtendedLine => "Extended line",
            DrawingKind::Channel => "Channel",
            DrawingKind::ParallelChannel => "Parallel channel",
            DrawingKind::Rectangle => "Rectangle",
            DrawingKind::Ellipse => "Ellipse",
            DrawingKind::Triangle => "Triangle",
            DrawingKind::Text => "Text",
            DrawingKind::Callout => "Callout",
            DrawingKind::PriceRange => "Price range",
            DrawingKind::FibRetracement => "Fib retracement",
            DrawingKind::FibExtension => "Fib extension",
            DrawingKind::FibTimeZones => "Fib time zones",
            DrawingKind::Pitchfork => "Pitchfork",
            DrawingKind::SchiffPitchfork => "Schiff pitchfork",
            DrawingKind::ModifiedSchiffPitchfork => "Modified Schiff pitchfork",
            DrawingKind::ElliottWave => "Elliott wave",
            DrawingKind::HeadAndShoulders => "Head & shoulders",
            DrawingKind::LongPosition => "Long position",
            DrawingKind::ShortPosition => "Short position",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Drawing {
    #[serde(default)]
    pub id: String,
    pub kind: DrawingKind,
    pub points: Vec<AnchorPoint>,
    #[serde(default)]
    pub style: DrawingStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<Rgba>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub z: i64,
    #[serde(skip)]
    pub selected: bool,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Drawing {
    /// A fresh, unsaved drawing. The store assigns id, z and timestamps on insert.
    pub fn new(kind: DrawingKind, points: Vec<AnchorPoint>, style: DrawingStyle) -> Self {
        Self {
            id: String::new(),
            kind,
            points,
            style,
            fill_color: None,
            fill_opacity: None,
            label: None,
            locked: false,
            hidden: false,
            z: 0,
            selected: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn with_fill(mut self, color: Rgba, opacity: f32) -> Self {
        self.fill_color = Some(color);
        self.fill_opacity = Some(opacity);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Resolved fill colour, or `None` when the kind cannot fill or no fill is set.
    pub fn fill(&self) -> Option<Rgba> {
        if !self.kind.has_fill() {
            return None;
        }
        let color = self.fill_color?;
        Some(color.with_opacity(self.fill_opacity.unwrap_or(1.0)))
    }

    /// Point count matches the kind and every coordinate is finite.
    pub fn is_well_formed(&self) -> bool {
        self.points.len() == self.kind.point_count() && self.points.iter().all(|p| p.is_finite())
    }

    pub fn caption(&self) -> String {
        match &self.label {
            Some(label) if !label.is_empty() => format!("{} · {}", self.kind.display_name(), label),
            _ => self.kind.display_name().to_string(),
        }
    }
}

/// Identifies one persisted drawing document.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChartKey {
    pub symbol: String,
    pub timeframe: String,
}

impl ChartKey {
    pub fn new(symbol: impl Into<String>, timeframe: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
        }
    }
}

impl std::fmt::Display for ChartKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.symbol, self.timeframe)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChartDocument {
    pub symbol: String,
    pub timeframe: String,
    pub drawings: Vec<Drawing>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct SeriesValue {
    pub time: i64,
    #[serde(default)]
    pub value: Option<f64>,
}

/// A pre-computed indicator line handed over by the indicator worker.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LineSeries {
    pub id: String,
    pub values: Vec<SeriesValue>,
}

impl LineSeries {
    pub fn new(id: impl Into<String>, values: Vec<SeriesValue>) -> Self {
        Self {
            id: id.into(),
            values,
        }
    }

    pub fn defined(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.values
            .iter()
            .filter_map(|v| v.value.filter(|x| x.is_finite()).map(|x| (v.time, x)))
    }
}

/// Fill the area between two named overlay series.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BandFill {
    pub upper: String,
    pub lower: String,
    pub color: Rgba,
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
