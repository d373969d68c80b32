use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    panel_pipeline::report::run_dashboard_report(std::env::args().skip(1))
}
