use tracing_subscriber::EnvFilter;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chartscribe=info")),
        )
        .init();

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Chartscribe",
        native_options,
        Box::new(|cc| Ok(Box::new(chartscribe::app::ChartApp::new(cc)))),
    )
}
