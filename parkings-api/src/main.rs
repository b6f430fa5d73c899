fn main() {
    if let Err(err) = vehicle_parkings::app::run() {
        eprintln!("api startup failed: {err}");
        std::process::exit(1);
    }
}
