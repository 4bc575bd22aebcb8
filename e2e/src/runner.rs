//! Test runner - executes tests and reports results

use colored::Colorize;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use crate::types::{SharedBackendState, TestResult};

/// Upper bound for one test; a hung stream fails the test instead of the run
const TEST_TIMEOUT: Duration = Duration::from_secs(20);

type TestFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// A single test case
pub struct TestCase {
    pub name: &'static str,
    pub description: &'static str,
    pub run: Box<dyn Fn(TestContext) -> TestFuture + Send + Sync>,
}

/// Context passed to each test - contains relay address and mock provider state
#[derive(Clone)]
pub struct TestContext {
    pub relay_addr: String,
    pub backend_state: SharedBackendState,
    pub http_client: reqwest::Client,
}

impl TestContext {
    fn reset_backend(&self) {
        self.backend_state.lock().unwrap().reset();
    }
}

async fn run_case(case: &TestCase, ctx: TestContext) -> anyhow::Result<()> {
    match tokio::time::timeout(TEST_TIMEOUT, (case.run)(ctx)).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!("timed out after {}s", TEST_TIMEOUT.as_secs())),
    }
}

/// Run all provided test cases sequentially and report results
pub async fn run_tests(cases: Vec<TestCase>, ctx: TestContext, filter: Option<&str>) -> Vec<TestResult> {
    let selected: Vec<&TestCase> = cases
        .iter()
        .filter(|c| filter.map_or(true, |f| c.name.contains(f)))
        .collect();

    println!("\n{}", "═══════════════════════════════════════════════════".bright_blue());
    println!("{}", "  chat-relay End-to-End Tests".bright_white().bold());
    println!("{}", "═══════════════════════════════════════════════════".bright_blue());
    println!("  Relay:   {}", ctx.relay_addr.bright_cyan());
    println!("  Running: {} test(s)\n", selected.len().to_string().bright_cyan());

    let mut results = Vec::with_capacity(selected.len());
    for case in selected {
        ctx.reset_backend();

        let start = Instant::now();
        print!("  {} {} ... ", "▶".bright_blue(), case.name.bright_white());
        let result = run_case(case, ctx.clone()).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let error = match result {
            Ok(()) => {
                println!("{} ({duration_ms}ms)", "PASS".bright_green().bold());
                None
            }
            Err(e) => {
                println!("{} ({duration_ms}ms)", "FAIL".bright_red().bold());
                for (depth, cause) in e.chain().enumerate() {
                    let label = if depth == 0 { "Error:".bright_red() } else { "Caused by:".yellow() };
                    println!("    {} {}", label, cause);
                }
                Some(e.to_string())
            }
        };

        results.push(TestResult {
            name: case.name.to_string(),
            passed: error.is_none(),
            error,
            duration_ms,
        });
    }

    print_summary(&results);
    results
}

fn print_summary(results: &[TestResult]) {
    let failed: Vec<&TestResult> = results.iter().filter(|r| !r.passed).collect();
    let passed = results.len() - failed.len();

    println!("\n{}", "───────────────────────────────────────────────────".bright_blue());
    let summary = format!("  Results: {} passed, {} failed", passed, failed.len());
    if failed.is_empty() {
        println!("{}", summary.bright_green().bold());
    } else {
        println!("{}", summary.bright_red().bold());
        for result in failed {
            println!("    {} {}", "✗".bright_red(), result.name);
        }
    }
    println!("{}\n", "═══════════════════════════════════════════════════".bright_blue());
}

/// Helper to list all available tests
pub fn list_tests(cases: &[TestCase]) {
    println!("\n{}", "Available tests:".bright_white().bold());
    for case in cases {
        println!("  {} - {}", case.name.bright_cyan(), case.description);
    }
    println!();
}
