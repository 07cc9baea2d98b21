use crate::coords::LinearViewport;
use crate::interaction::InteractionController;
use crate::model::{ChartKey, LineSeries, Rgba, SeriesValue};
use crate::persist::{FileBackend, PersistenceSync};
use crate::render::{CanvasSize, OverlayLine, Renderer, RepaintReason};
use crate::settings::{self, AppSettings};
use crate::store::DrawingStore;
use std::path::PathBuf;

mod help;
mod painter;
mod panel;
mod update;

const HOUR_MS: i64 = 3_600_000;
const DEMO_BARS: usize = 240;

/// Synthetic price history and its indicator overlays.
struct MarketData {
    bars: Vec<i64>,
    overlays: Vec<OverlayLine>,
}

impl MarketData {
    /// Deterministic walk per symbol, with a 20-bar mean and 2-sigma bands.
    fn demo(symbol: &str, timeframe: &str) -> Self {
        let seed = symbol
            .bytes()
            .chain(timeframe.bytes())
            .fold(7u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
        let phase = (seed % 628) as f64 / 100.0;
        let start = crate::model::now_ms() / HOUR_MS * HOUR_MS - DEMO_BARS as i64 * HOUR_MS;
        let bars: Vec<i64> = (0..DEMO_BARS as i64).map(|i| start + i * HOUR_MS).collect();
        let closes: Vec<f64> = (0..DEMO_BARS)
            .map(|i| {
                let t = i as f64;
                100.0 + 12.0 * (t / 23.0 + phase).sin() + 5.0 * (t / 7.0).cos() + t * 0.05
            })
            .collect();

        const WINDOW: usize = 20;
        let mut mean = Vec::with_capacity(DEMO_BARS);
        let mut upper = Vec::with_capacity(DEMO_BARS);
        let mut lower = Vec::with_capacity(DEMO_BARS);
        for i in 0..DEMO_BARS {
            if i + 1 < WINDOW {
                mean.push(None);
                upper.push(None);
                lower.push(None);
                continue;
            }
            let window = &closes[i + 1 - WINDOW..=i];
            let m = window.iter().sum::<f64>() / WINDOW as f64;
            let sd = (window.iter().map(|c| (c - m).powi(2)).sum::<f64>() / WINDOW as f64).sqrt();
            mean.push(Some(m));
            upper.push(Some(m + 2.0 * sd));
            lower.push(Some(m - 2.0 * sd));
        }

        let series = |id: &str, values: Vec<Option<f64>>| {
            LineSeries::new(
                id,
                bars.iter()
                    .zip(values)
                    .map(|(time, value)| SeriesValue { time: *time, value })
                    .collect(),
            )
        };
        let overlays = vec![
            OverlayLine {
                series: series("close", closes.iter().copied().map(Some).collect()),
                color: Rgba::rgb(220, 220, 220),
                width: 1.5,
            },
            OverlayLine {
                series: series("mean", mean),
                color: Rgba::rgb(255, 152, 0),
                width: 1.0,
            },
            OverlayLine {
                series: series("upper", upper),
                color: Rgba::rgb(41, 98, 255).with_opacity(0.7),
                width: 1.0,
            },
            OverlayLine {
                series: series("lower", lower),
                color: Rgba::rgb(41, 98, 255).with_opacity(0.7),
                width: 1.0,
            },
        ];
        Self { bars, overlays }
    }

    fn time_range(&self) -> (i64, i64) {
        match (self.bars.first(), self.bars.last()) {
            (Some(first), Some(last)) => (*first, *last + HOUR_MS),
            _ => (0, HOUR_MS),
        }
    }

    fn price_range(&self) -> (f64, f64) {
        let (lo, hi) = self
            .overlays
            .iter()
            .flat_map(|o| o.series.defined())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, v)| {
                (lo.min(v), hi.max(v))
            });
        if lo.is_finite() && hi.is_finite() && hi > lo {
            let pad = (hi - lo) * 0.1;
            (lo - pad, hi + pad)
        } else {
            (0.0, 1.0)
        }
    }
}

pub struct ChartApp {
    settings: AppSettings,
    settings_path: PathBuf,
    viewport: LinearViewport,
    store: DrawingStore,
    controller: InteractionController,
    renderer: Renderer,
    sync: PersistenceSync,
    market: MarketData,
    symbol_input: String,
    timeframe_input: String,
    label_input: String,
    label_for: Option<String>,
    status: Option<String>,
    show_help: bool,
    pointer_down: bool,
}

impl ChartApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let (settings, path) = settings::load_or_default();
        let settings_path = path.unwrap_or_else(|| PathBuf::from("settings.toml"));
        let backend = FileBackend::new(&settings.drawings_dir);
        let sync = PersistenceSync::new(Box::new(backend), settings.sync_options());
        let controller = InteractionController::new(settings.interaction_options());
        let market = MarketData::demo(&settings.symbol, &settings.timeframe);
        let ((t0, t1), (p0, p1)) = (market.time_range(), market.price_range());

        let mut app = Self {
            symbol_input: settings.symbol.clone(),
            timeframe_input: settings.timeframe.clone(),
            settings,
            settings_path,
            viewport: LinearViewport::new(t0, t1, p0, p1),
            store: DrawingStore::new(),
            controller,
            renderer: Renderer::new(CanvasSize::default()),
            sync,
            market,
            label_input: String::new(),
            label_for: None,
            status: None,
            show_help: false,
            pointer_down: false,
        };
        let key = ChartKey::new(&app.settings.symbol, &app.settings.timeframe);
        app.open_chart(key);
        app
    }

    /// Saves the current chart and switches to `key`.
    fn open_chart(&mut self, key: ChartKey) {
        self.controller.handle(
            crate::interaction::InputEvent::Cancel,
            &mut self.store,
            &crate::coords::CoordinateMapper::new(&self.viewport),
        );
        self.market = MarketData::demo(&key.symbol, &key.timeframe);
        self.viewport
            .fit(self.market.time_range(), self.market.price_range());
        self.status = Some(match self.sync.switch_chart(key.clone(), &mut self.store) {
            Ok(report) if report.dropped > 0 => format!(
                "{key}: loaded {} drawings, dropped {} malformed",
                report.loaded, report.dropped
            ),
            Ok(report) => format!("{key}: loaded {} drawings", report.loaded),
            Err(e) => format!("{key}: {e}"),
        });
        self.settings.symbol = key.symbol;
        self.settings.timeframe = key.timeframe;
        self.renderer.request(RepaintReason::Data);
    }

    fn persist_settings(&mut self) {
        if let Err(e) = settings::save_settings(&self.settings_path, &self.settings) {
            self.status = Some(e.to_string());
        }
    }

    fn apply_settings(&mut self) {
        self.controller
            .set_options(self.settings.interaction_options());
        self.sync.set_options(self.settings.sync_options());
        self.renderer.request(RepaintReason::Data);
        self.persist_settings();
    }

    fn fit(&mut self) {
        self.viewport
            .fit(self.market.time_range(), self.market.price_range());
        self.renderer.request(RepaintReason::Viewport);
    }
}

impl Drop for ChartApp {
    fn drop(&mut self) {
        if let Err(e) = self.sync.flush(&self.store) {
            tracing::warn!(error = %e, "drawings not saved on exit");
        }
    }
}
