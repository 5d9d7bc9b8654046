use clap::Parser as _;
use log::info;
use order_wire_bench::{
    benchmark::{
        BenchConfigSummary, BenchmarkSuite, CaseReport, CaseSummary, ReportMetadata, SuiteReport,
    },
    config::OrderBenchConfig,
    data::{Order, build, build_at},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = OrderBenchConfig::parse();
    config.validate()?;

    let fixture = if config.live_timestamp {
        build_at(chrono::Utc::now().timestamp())
    } else {
        build()
    };
    info!(
        "Fixture: order {} with {} items ({} units), created_on {}",
        fixture.id,
        fixture.order_items.len(),
        fixture.total_quantity(),
        fixture.created_on
    );

    let reports = run_benchmark(&config, &fixture);
    report_results(&reports, &config, &fixture)?;

    let failed = reports.iter().filter(|r| r.outcome.is_err()).count();
    if failed > 0 {
        return Err(format!("{failed} of {} benchmark cases failed", reports.len()).into());
    }

    Ok(())
}

fn run_benchmark(config: &OrderBenchConfig, fixture: &Order) -> Vec<CaseReport> {
    let suite = BenchmarkSuite::new(fixture, config.iteration_policy(), config.samples)
        .with_option_overrides(config.emit_defaults, config.discard_unknown);
    let cases = BenchmarkSuite::cases(&config.codec, &config.operation);

    info!(
        "Running {} cases, {} samples each, {:?}",
        cases.len(),
        config.samples,
        config.iteration_policy()
    );

    suite.run_all(&cases)
}

fn report_results(
    reports: &[CaseReport],
    config: &OrderBenchConfig,
    fixture: &Order,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = SuiteReport {
        config_summary: BenchConfigSummary {
            iteration_policy: format!("{:?}", config.iteration_policy()),
            samples: config.samples,
            fixture_created_on: fixture.created_on,
            fixture_items: fixture.order_items.len(),
        },
        cases: reports.iter().map(CaseSummary::from).collect(),
        metadata: ReportMetadata {
            timestamp: chrono::Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_owned(),
        },
    };

    if let Some(path) = &config.output {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        info!("Results saved to: {}", path.display());
    }

    info!("MACHINE_READABLE: {}", serde_json::to_string(&report.cases)?);

    print_results_summary(&report.cases);
    Ok(())
}

fn print_results_summary(cases: &[CaseSummary]) {
    println!("\n| Codec | Operation | Bytes | Ops/sec | ns/op (p50) | Variability |");
    println!("|-------|-----------|-------|---------|-------------|-------------|");
    for case in cases {
        match (&case.error, &case.latency) {
            (None, Some(latency)) => println!(
                "| {} | {} | {} | {:.1} | {:.1} | {:.1}% |",
                case.codec,
                case.operation,
                case.encoded_bytes.unwrap_or_default(),
                case.mean_ops_sec.unwrap_or_default(),
                latency.p50_ns,
                case.variability_percent.unwrap_or_default()
            ),
            (error, _) => println!(
                "| {} | {} | - | FAILED | - | {} |",
                case.codec,
                case.operation,
                error.as_deref().unwrap_or("no measurement")
            ),
        }
    }
}
