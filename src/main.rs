use ice_popsicles::config::PipelineConfig;
use ice_popsicles::logging::{self, DataSource};
use ice_popsicles::pipeline;
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = match PipelineConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logger(
        config.min_log_level(),
        config.log_file.as_deref(),
        config.log_timestamps,
    );

    println!("🧊 Ice popsicles: {} to {}", config.start_date, config.end_date);

    match pipeline::run(&config) {
        Ok(report) => {
            println!();
            println!("States:       {} fetched, {} skipped", report.states_fetched.len(), report.states_failed.len());
            for (state, reason) in &report.states_failed {
                println!("   - {}: {}", state, reason);
            }
            println!("Observations: {} fetched, {} classified", report.observations, report.classified);
            println!("Summaries:    {} state-days", report.summaries.len());
            println!("Sites:        {} located, {} missing", report.sites.len(), report.sites_missing.len());
            println!("Chart:        {} ({} panels)", report.image.path.display(), report.image.panels);
            ExitCode::SUCCESS
        }
        Err(e) => {
            logging::error(DataSource::System, None, &format!("run aborted: {}", e));
            ExitCode::FAILURE
        }
    }
}
