fn main() {
    if let Err(err) = vehicle_parkings::app::run() {
        eprintln!("application startup failed: {err}");
        std::process::exit(1);
    }
}
