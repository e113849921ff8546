use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use nimbus_ui::{bridge, WeatherModel};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn main() -> Result<()> {
    // Initialize core
    nimbus_core::init()?;

    let (config, _warnings) = nimbus_core::Config::load_validated()?;
    tracing::debug!("Loaded config from {}", config.config_dir.display());

    let runtime = bridge::get_or_init_runtime()?;
    let service = bridge::build_weather_service(&config)?;

    let mut model = WeatherModel::new(Arc::new(service), runtime);
    model.start();
    wait_until_settled(&mut model);

    if let Some(alert) = model.take_alert() {
        eprintln!("! {}", alert);
    }

    print_screen(&model);

    while model.can_retry() && ask_retry()? {
        model.retry();
        wait_until_settled(&mut model);
        print_screen(&model);
    }

    if model.is_ready() {
        model.toggle_week();
        print_forecast(&model);
    }

    // Graceful shutdown
    model.shutdown();
    Ok(())
}

fn wait_until_settled(model: &mut WeatherModel) {
    while model.is_loading() {
        if !model.poll() {
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

fn ask_retry() -> Result<bool> {
    print!("Retry? [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

fn print_screen(model: &WeatherModel) {
    if let Some(title) = model.title() {
        println!("{}", title);
    }

    let Some(current) = model.current() else {
        return;
    };

    println!("{}", current.temperature_label);
    println!("{}", current.icon_url);
    println!("Sunrise {}   Sunset {}", current.sunrise, current.sunset);
    println!();
    print_forecast(model);
}

fn print_forecast(model: &WeatherModel) {
    let heading = if model.is_today_selected() { "Today" } else { "Week" };
    println!("[{}]", heading);
    for tile in model.visible_forecast() {
        println!("  {:>5}  {:>4}  {}", tile.label, tile.temperature, tile.icon_url);
    }
}
