use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    keyword_triage::example_apps::run_keyword_report(std::env::args().skip(1))
}
