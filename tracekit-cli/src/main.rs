mod cli;
mod prompts;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use tracekit_core::models::UNDEFINED_LABEL;
use tracekit_core::{
    get_config_path, open_project_backend, open_report_store, CoverageRow, CoverageSummary,
    ExecutionResult, Priority, ProjectBackend, ProjectStore, Report, ReportAssembler,
    ReportOptions, Requirement, RequirementStatus, RequirementUpdate, RiskLevel, Settings,
    StoredReport, TestCase, TestType, YamlBackend,
};

use crate::cli::{
    CaseCommand, Cli, Command, ConfigCommand, ProjectCommand, ReportsCommand, ReqCommand,
    SuiteCommand,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = Settings::load()?;
    if let Some(dir) = &cli.data_dir {
        settings.data_dir = dir.clone();
    }
    debug!(data_dir = %settings.data_dir.display(), "Loaded settings");

    let app = App {
        backend: open_project_backend(&settings),
        settings,
        project: cli.project.clone(),
        json: cli.json,
    };

    match &cli.command {
        Command::Project(cmd) => handle_project_command(&app, cmd)?,
        Command::Req(cmd) => handle_req_command(&app, cmd)?,
        Command::Suite(cmd) => handle_suite_command(&app, cmd)?,
        Command::Case(cmd) => handle_case_command(&app, cmd)?,
        Command::Link {
            requirement,
            test_case,
        } => link(&app, requirement, test_case)?,
        Command::Unlink {
            requirement,
            test_case,
            yes,
        } => unlink(&app, requirement, test_case, *yes)?,
        Command::Run {
            suite,
            environment,
            executor,
            results,
        } => run_suite(&app, suite, environment, executor.as_deref(), results)?,
        Command::Matrix { requirement } => show_matrix(&app, requirement.as_deref())?,
        Command::Coverage => show_coverage(&app)?,
        Command::Report {
            preview,
            no_metrics,
            no_risk,
            no_coverage,
        } => {
            let defaults = app.settings.report;
            let options = ReportOptions {
                include_metrics: defaults.include_metrics && !no_metrics,
                include_risk_analysis: defaults.include_risk_analysis && !no_risk,
                include_coverage_analysis: defaults.include_coverage_analysis && !no_coverage,
                preview: defaults.preview || *preview,
            };
            generate_report(&app, &options)?;
        }
        Command::Reports(cmd) => handle_reports_command(&app, cmd)?,
        Command::Config(cmd) => handle_config_command(&app, cmd)?,
    }

    Ok(())
}

/// Logs go to stderr so `--json` output stays clean
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

struct App {
    settings: Settings,
    backend: YamlBackend,
    project: Option<String>,
    json: bool,
}

impl App {
    fn project(&self) -> Result<String> {
        self.settings.resolve_project(self.project.as_deref())
    }

    fn load(&self) -> Result<ProjectStore> {
        let project = self.project()?;
        self.backend
            .load(&project)?
            .with_context(|| format!("Project not found: {}", project))
    }

    /// Runs `update_fn` under the project lock and returns its result
    fn modify<R>(&self, mut update_fn: impl FnMut(&mut ProjectStore) -> Result<R>) -> Result<R> {
        let project = self.project()?;
        let mut output = None;
        self.backend
            .modify(&project, &mut |store: &mut ProjectStore| {
                output = Some(update_fn(store)?);
                Ok(())
            })?;
        output.context("Project update returned no result")
    }

    fn assembler(&self) -> ReportAssembler<'_> {
        ReportAssembler::new(&self.backend)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_priority(value: Option<&str>) -> Result<Option<Priority>> {
    value.map(|p| p.parse::<Priority>()).transpose().map_err(Into::into)
}

fn parse_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn priority_colored(priority: Option<Priority>) -> ColoredString {
    match priority {
        Some(Priority::Critical) => "Critical".red().bold(),
        Some(Priority::High) => "High".red(),
        Some(Priority::Medium) => "Medium".yellow(),
        Some(Priority::Low) => "Low".green(),
        None => UNDEFINED_LABEL.dimmed(),
    }
}

fn status_colored(status: RequirementStatus) -> ColoredString {
    match status {
        RequirementStatus::Draft => "Draft".yellow(),
        RequirementStatus::Approved => "Approved".blue(),
        RequirementStatus::Implemented => "Implemented".cyan(),
        RequirementStatus::Verified => "Verified".green(),
        RequirementStatus::Obsolete => "Obsolete".dimmed(),
    }
}

fn risk_colored(level: RiskLevel) -> ColoredString {
    match level {
        RiskLevel::Critical => "Critical".red().bold(),
        RiskLevel::High => "High".red(),
        RiskLevel::Medium => "Medium".yellow(),
        RiskLevel::Low => "Low".green(),
        RiskLevel::Undefined => "Undefined".dimmed(),
    }
}

fn percent_colored(value: f64) -> ColoredString {
    let text = format!("{:.1}%", value);
    if value >= 80.0 {
        text.green()
    } else if value >= 50.0 {
        text.yellow()
    } else {
        text.red()
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

fn handle_project_command(app: &App, cmd: &ProjectCommand) -> Result<()> {
    match cmd {
        ProjectCommand::Init { name, default } => {
            let name = match name {
                Some(name) => name.clone(),
                None => prompts::prompt_required("Project name:")?,
            };
            app.backend.create_project(&name)?;
            println!("{} Created project {}", "✓".green(), name.green());

            if *default {
                let path = get_config_path()?;
                let mut settings = Settings::load_from(&path)?;
                settings.default_project = Some(name.clone());
                settings.save_to(&path)?;
                println!("Default project set to {} in {:?}", name, path);
            }
        }
        ProjectCommand::List => {
            let projects = app.backend.list_projects()?;
            if app.json {
                return print_json(&projects);
            }
            if projects.is_empty() {
                println!("{}", "No projects found.".yellow());
                return Ok(());
            }
            let current = app.project().ok();
            for project in projects {
                if current.as_deref() == Some(project.as_str()) {
                    println!("* {}", project.green());
                } else {
                    println!("  {}", project);
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Requirements
// ---------------------------------------------------------------------------

fn handle_req_command(app: &App, cmd: &ReqCommand) -> Result<()> {
    match cmd {
        ReqCommand::Add {
            name,
            description,
            priority,
            tags,
        } => add_requirement(app, name.as_deref(), description, priority.as_deref(), tags.as_deref()),
        ReqCommand::List {
            priority,
            status,
            tag,
        } => list_requirements(app, priority.as_deref(), status.as_deref(), tag.as_deref()),
        ReqCommand::Show { id } => show_requirement(app, id),
        ReqCommand::Update {
            id,
            name,
            description,
            priority,
            status,
            tags,
        } => {
            let update = RequirementUpdate {
                name: name.clone(),
                description: description.clone(),
                priority: parse_priority(priority.as_deref())?,
                status: status
                    .as_deref()
                    .map(|s| s.parse::<RequirementStatus>())
                    .transpose()?,
                tags: tags.as_deref().map(parse_tags),
            };
            update_requirement(app, id, update)
        }
        ReqCommand::History { id } => show_history(app, id),
    }
}

fn add_requirement(
    app: &App,
    name: Option<&str>,
    description: &str,
    priority: Option<&str>,
    tags: Option<&str>,
) -> Result<()> {
    let actor = app.settings.actor();
    let tags = tags.map(parse_tags).unwrap_or_default();

    let (name, description, priority) = match name {
        Some(name) => (name.to_string(), description.to_string(), parse_priority(priority)?),
        None => {
            let answers = prompts::prompt_new_requirement(&app.load()?.peek_next_code())?;
            (answers.name, answers.description, answers.priority)
        }
    };

    let requirement = app.modify(|store| {
        Ok(store
            .create_requirement(&name, &description, priority, tags.clone(), &actor)
            .clone())
    })?;

    if app.json {
        return print_json(&requirement);
    }
    println!("{}", "Requirement added successfully!".green());
    println!("Code: {}", requirement.code.green());
    println!("UUID: {}", requirement.id);
    Ok(())
}

fn list_requirements(
    app: &App,
    priority: Option<&str>,
    status: Option<&str>,
    tag: Option<&str>,
) -> Result<()> {
    let mut requirements = app.load()?.requirements;

    if let Some(priority) = parse_priority(priority)? {
        requirements.retain(|r| r.priority == Some(priority));
    }
    if let Some(status) = status {
        let status = status.parse::<RequirementStatus>()?;
        requirements.retain(|r| r.status == status);
    }
    if let Some(tag) = tag {
        requirements.retain(|r| r.tags.iter().any(|t| t == tag));
    }

    if app.json {
        return print_json(&requirements);
    }
    if requirements.is_empty() {
        println!("{}", "No requirements found.".yellow());
        return Ok(());
    }

    println!(
        "{:<8} | {:<36} | {:<10} | {:<12} | {:<5}",
        "Code", "Name", "Priority", "Status", "Links"
    );
    println!("{}", "-".repeat(82));
    for req in &requirements {
        println!(
            "{:<8} | {:<36} | {:<10} | {:<12} | {:<5}",
            req.code,
            truncate(&req.name, 36),
            priority_colored(req.priority),
            status_colored(req.status),
            req.linked_test_cases.len()
        );
    }
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

fn print_requirement(req: &Requirement) {
    println!("{}: {}", "Code".blue(), req.code);
    println!("{}: {}", "ID".blue(), req.id);
    println!("{}: {}", "Name".blue(), req.name);
    if !req.description.is_empty() {
        println!("{}: {}", "Description".blue(), req.description);
    }
    println!("{}: {}", "Priority".blue(), priority_colored(req.priority));
    println!("{}: {}", "Status".blue(), status_colored(req.status));
    if !req.tags.is_empty() {
        println!("{}: {}", "Tags".blue(), req.tags.join(", "));
    }
    println!("{}: {}", "Created".blue(), req.created_at);
    println!("{}: {}", "Modified".blue(), req.modified_at);
}

fn show_requirement(app: &App, id: &str) -> Result<()> {
    let project = app.project()?;
    let row = app.assembler().row(&project, id)?;

    if app.json {
        return print_json(&row);
    }

    print_requirement(&row.requirement);
    println!();
    if row.linked_test_cases.is_empty() {
        println!("{}", "No linked test cases.".yellow());
        return Ok(());
    }

    println!("{}:", "Linked test cases".green());
    for linked in &row.linked_test_cases {
        let status = linked
            .status()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "Not executed".to_string());
        println!(
            "  {} {} ({}) - {}",
            linked.test_case.id.yellow(),
            linked.test_case.name,
            linked.suite_name,
            status
        );
    }
    let summary = &row.execution_summary;
    println!(
        "Pass rate: {}  (passed {}, failed {}, blocked {}, not executed {})",
        percent_colored(row.pass_rate),
        summary.passed,
        summary.failed,
        summary.blocked,
        summary.not_executed
    );
    Ok(())
}

fn update_requirement(app: &App, id: &str, update: RequirementUpdate) -> Result<()> {
    if update.name.is_none()
        && update.description.is_none()
        && update.priority.is_none()
        && update.status.is_none()
        && update.tags.is_none()
    {
        anyhow::bail!("Nothing to update: pass at least one field option");
    }

    let actor = app.settings.actor();
    let requirement =
        app.modify(|store| Ok(store.update_requirement(id, update.clone(), &actor)?.clone()))?;

    if app.json {
        return print_json(&requirement);
    }
    println!("{} Updated {}", "✓".green(), requirement.code);
    Ok(())
}

fn show_history(app: &App, id: &str) -> Result<()> {
    let store = app.load()?;
    let requirement = store.requirement(id)?;

    if app.json {
        return print_json(&requirement.history);
    }

    println!("{} {}", requirement.code.blue().bold(), requirement.name);
    for entry in &requirement.history {
        println!(
            "  {} {:<9} {:<12} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.action.to_string().cyan(),
            entry.actor,
            entry.details
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Suites and test cases
// ---------------------------------------------------------------------------

fn handle_suite_command(app: &App, cmd: &SuiteCommand) -> Result<()> {
    match cmd {
        SuiteCommand::Add { name } => {
            let name = match name {
                Some(name) => name.clone(),
                None => prompts::prompt_required("Suite name:")?,
            };
            let suite = app.modify(|store| Ok(store.add_suite(&name)?.clone()))?;

            if app.json {
                return print_json(&suite);
            }
            println!("{} Added suite {}", "✓".green(), suite.name.green());
            println!("UUID: {}", suite.id);
        }
        SuiteCommand::List => {
            let suites = app.load()?.suites;
            if app.json {
                return print_json(&suites);
            }
            if suites.is_empty() {
                println!("{}", "No test suites found.".yellow());
                return Ok(());
            }

            println!(
                "{:<24} | {:>5} | {:>9} | {:>10} | {:<20}",
                "Suite", "Cases", "Pass rate", "Automation", "Last execution"
            );
            println!("{}", "-".repeat(80));
            for suite in &suites {
                let last = suite
                    .stats
                    .last_execution
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<24} | {:>5} | {:>9} | {:>10} | {:<20}",
                    truncate(&suite.name, 24),
                    suite.stats.total,
                    format!("{:.1}%", suite.stats.pass_rate),
                    format!("{:.1}%", suite.stats.automation_rate),
                    last
                );
            }
        }
    }
    Ok(())
}

fn handle_case_command(app: &App, cmd: &CaseCommand) -> Result<()> {
    match cmd {
        CaseCommand::Add {
            suite,
            id,
            name,
            description,
            priority,
            test_type,
            steps,
            prerequisites,
            expected,
        } => {
            let name = match name {
                Some(name) => name.clone(),
                None => prompts::prompt_required("Test case name:")?,
            };
            let mut case = TestCase::new(id.as_str(), name).with_type(test_type.parse::<TestType>()?);
            case.description = description.clone();
            case.priority = parse_priority(priority.as_deref())?;
            case.steps = steps.clone();
            case.prerequisites = prerequisites.clone();
            case.expected_result = expected.clone();

            app.modify(|store| Ok(store.add_test_case(suite, case.clone())?))?;

            if app.json {
                return print_json(&case);
            }
            println!("{} Added test case {} to {}", "✓".green(), id.green(), suite);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Links and executions
// ---------------------------------------------------------------------------

fn link(app: &App, requirement: &str, test_case: &str) -> Result<()> {
    let project = app.project()?;
    let changed = app
        .backend
        .link_test_case(&project, requirement, test_case, &app.settings.actor())?;

    if changed {
        println!("{} Linked {} to {}", "✓".green(), test_case.green(), requirement);
    } else {
        println!("{} is already linked to {}", test_case.yellow(), requirement);
    }
    Ok(())
}

fn unlink(app: &App, requirement: &str, test_case: &str, skip_confirm: bool) -> Result<()> {
    let project = app.project()?;

    if !skip_confirm {
        let message = format!("Remove link from {} to {}?", requirement, test_case);
        if !prompts::confirm(&message)? {
            println!("{}", "Unlink cancelled.".yellow());
            return Ok(());
        }
    }

    let changed = app
        .backend
        .unlink_test_case(&project, requirement, test_case, &app.settings.actor())?;

    if changed {
        println!("{} Unlinked {} from {}", "✓".green(), test_case, requirement);
    } else {
        println!("{} was not linked to {}", test_case.yellow(), requirement);
    }
    Ok(())
}

fn parse_result(value: &str) -> Result<ExecutionResult> {
    let (id, status) = value
        .split_once('=')
        .with_context(|| format!("Invalid result '{}': expected ID=STATUS", value))?;
    Ok(ExecutionResult::new(id.trim(), status.trim().parse()?))
}

fn run_suite(
    app: &App,
    suite: &str,
    environment: &str,
    executor: Option<&str>,
    results: &[String],
) -> Result<()> {
    let executor = executor
        .map(str::to_string)
        .unwrap_or_else(|| app.settings.actor());

    // Prompt before taking the project lock
    let results = if results.is_empty() {
        let store = app.load()?;
        let suite = store.suite(suite)?;
        if suite.test_cases.is_empty() {
            anyhow::bail!("Suite '{}' has no test cases", suite.name);
        }
        suite
            .test_cases
            .iter()
            .map(|case| Ok(ExecutionResult::new(case.id.as_str(), prompts::prompt_result(case)?)))
            .collect::<Result<Vec<_>>>()?
    } else {
        results
            .iter()
            .map(|r| parse_result(r))
            .collect::<Result<Vec<_>>>()?
    };

    let execution = app.modify(|store| {
        Ok(store
            .finalize_execution(suite, environment, &executor, results.clone(), Utc::now())?
            .clone())
    })?;

    if app.json {
        return print_json(&execution);
    }
    let summary = execution.summary;
    println!(
        "{} Recorded execution {} ({} results)",
        "✓".green(),
        execution.id,
        summary.total()
    );
    println!(
        "Passed: {}  Failed: {}  Blocked: {}  Skipped: {}",
        summary.passed.to_string().green(),
        summary.failed.to_string().red(),
        summary.blocked.to_string().yellow(),
        summary.skipped
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Matrix, coverage and reports
// ---------------------------------------------------------------------------

fn print_matrix(rows: &[CoverageRow]) {
    if rows.is_empty() {
        println!("{}", "No requirements found.".yellow());
        return;
    }

    println!(
        "{:<8} | {:<30} | {:<10} | {:>5} | {:>9} | {:>4} {:>4} {:>4} {:>4}",
        "Code", "Name", "Priority", "Cases", "Pass rate", "P", "F", "B", "NE"
    );
    println!("{}", "-".repeat(96));
    for row in rows {
        let summary = &row.execution_summary;
        let pass_rate = if row.is_covered() {
            percent_colored(row.pass_rate)
        } else {
            "uncovered".red()
        };
        println!(
            "{:<8} | {:<30} | {:<10} | {:>5} | {:>9} | {:>4} {:>4} {:>4} {:>4}",
            row.requirement.code,
            truncate(&row.requirement.name, 30),
            priority_colored(row.priority()),
            summary.total,
            pass_rate,
            summary.passed,
            summary.failed,
            summary.blocked,
            summary.not_executed
        );
    }
}

fn show_matrix(app: &App, requirement: Option<&str>) -> Result<()> {
    let project = app.project()?;
    let rows = match requirement {
        Some(id) => vec![app.assembler().row(&project, id)?],
        None => app.assembler().matrix(&project)?,
    };

    if app.json {
        return print_json(&rows);
    }
    print_matrix(&rows);
    Ok(())
}

fn print_coverage(coverage: &CoverageSummary) {
    println!("{}", "Coverage".blue().bold());
    println!(
        "  Requirements covered: {}/{} ({})",
        coverage.covered_requirements,
        coverage.total_requirements,
        percent_colored(coverage.coverage_percent)
    );
    println!(
        "  Requirements passing: {}/{} ({})",
        coverage.passed_requirements,
        coverage.covered_requirements,
        percent_colored(coverage.pass_rate)
    );
    for (label, bucket) in &coverage.priority_coverage {
        println!(
            "  {:<10} {:>3}/{:<3} covered ({:.1}%), {} passing ({:.1}%)",
            label,
            bucket.covered,
            bucket.total,
            bucket.coverage_percent,
            bucket.passed,
            bucket.pass_percent
        );
    }
}

fn show_coverage(app: &App) -> Result<()> {
    let coverage = app.assembler().coverage(&app.project()?)?;
    if app.json {
        return print_json(&coverage);
    }
    print_coverage(&coverage);
    Ok(())
}

fn print_report(report: &Report) {
    println!(
        "{} {} ({})",
        "Quality report for".bold(),
        report.project.green().bold(),
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();

    if let Some(rows) = &report.coverage_matrix {
        print_matrix(rows);
        println!();
    }
    if let Some(coverage) = &report.coverage {
        print_coverage(coverage);
        println!();
    }

    if let Some(risk) = &report.risk {
        println!("{}", "Risk".blue().bold());
        println!(
            "  Level: {} (score {:.2})",
            risk_colored(risk.risk_level),
            risk.risk_score
        );
        if !risk.critical_uncovered.is_empty() {
            let codes: Vec<_> = risk.critical_uncovered.iter().map(|r| r.code.as_str()).collect();
            println!("  Uncovered high-priority: {}", codes.join(", ").red());
        }
        for failing in &risk.critical_failing {
            let tests: Vec<_> = failing
                .failing_tests
                .iter()
                .map(|t| t.test_case.id.as_str())
                .collect();
            println!(
                "  Failing: {} ({})",
                failing.requirement.code.red(),
                tests.join(", ")
            );
        }
        println!();
    }

    if let Some(quality) = &report.quality {
        println!("{}", "Quality scores (0-5)".blue().bold());
        println!(
            "  Requirements: {:.2}  Testing: {:.2}  Automation: {:.2}  Overall: {}",
            quality.requirements.quality_score,
            quality.testing.quality_score,
            quality.automation.quality_score,
            format!("{:.2}", quality.overall_quality_score).bold()
        );
        println!(
            "  Executed {}/{} tests ({:.1}%), automation {:.1}%",
            quality.testing.executed_tests,
            quality.testing.total_tests,
            quality.testing.execution_rate,
            quality.automation.automation_rate
        );
        println!();
    }

    println!("{}", "Recommendations".blue().bold());
    if report.recommendations.is_empty() {
        println!("  {}", "None".green());
    }
    for rec in &report.recommendations {
        let tag = format!("[{}/{}]", rec.kind, rec.area);
        let tag = match rec.kind {
            tracekit_core::RecommendationType::Critical => tag.red().bold(),
            tracekit_core::RecommendationType::High => tag.red(),
            tracekit_core::RecommendationType::Medium => tag.yellow(),
            tracekit_core::RecommendationType::Low => tag.normal(),
        };
        println!("  {} {}", tag, rec.message);
        if !rec.details.is_empty() {
            println!("      {}", rec.details.dimmed());
        }
    }
}

fn generate_report(app: &App, options: &ReportOptions) -> Result<()> {
    let project = app.project()?;
    let store = open_report_store(&app.settings)?;
    let assembler = app.assembler().with_store(store.as_ref());
    let outcome = assembler.generate(&project, options)?;

    if app.json {
        return print_json(&outcome.report);
    }
    print_report(&outcome.report);
    match outcome.stored {
        Some(id) => println!("\nStored as report {}", id.to_string().green()),
        None => println!("\n{}", "Preview only, not stored.".yellow()),
    }
    Ok(())
}

fn handle_reports_command(app: &App, cmd: &ReportsCommand) -> Result<()> {
    let store = open_report_store(&app.settings)?;
    let assembler = app.assembler().with_store(store.as_ref());

    match cmd {
        ReportsCommand::List => {
            let history = assembler.history(&app.project()?)?;
            if app.json {
                return print_json(&history);
            }
            if history.is_empty() {
                println!("{}", "No stored reports.".yellow());
                return Ok(());
            }
            for stored in &history {
                print_report_line(stored);
            }
        }
        ReportsCommand::Show { id } => {
            let id = Uuid::parse_str(id).with_context(|| format!("Invalid report id: {}", id))?;
            let stored = assembler.load(&id)?;
            if app.json {
                return print_json(&stored);
            }
            print_report(&stored.report);
        }
    }
    Ok(())
}

fn print_report_line(stored: &StoredReport) {
    let report = &stored.report;
    let risk = report
        .risk
        .as_ref()
        .map(|r| risk_colored(r.risk_level))
        .unwrap_or_else(|| "-".normal());
    let overall = report
        .quality
        .as_ref()
        .map(|q| format!("{:.2}", q.overall_quality_score))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{}  {}  risk {:<9} quality {:<5} {} recommendations",
        stored.id,
        report.generated_at.format("%Y-%m-%d %H:%M"),
        risk,
        overall,
        report.recommendations.len()
    );
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

fn handle_config_command(app: &App, cmd: &ConfigCommand) -> Result<()> {
    let path = get_config_path()?;

    match cmd {
        ConfigCommand::Show => {
            if app.json {
                return print_json(&app.settings);
            }
            let settings = &app.settings;
            println!("{}", "Configuration".blue().bold());
            println!("{}: {:?}", "File".cyan(), path);
            println!("{}: {}", "Data directory".cyan(), settings.data_dir.display());
            println!(
                "{}: {}",
                "Default project".cyan(),
                settings.default_project.as_deref().unwrap_or("-")
            );
            println!("{}: {}", "Report history".cyan(), settings.report_backend);
            println!("{}: {}", "Actor".cyan(), settings.actor());
            let report = settings.report;
            println!(
                "{}: metrics={} risk={} coverage={} preview={}",
                "Report sections".cyan(),
                report.include_metrics,
                report.include_risk_analysis,
                report.include_coverage_analysis,
                report.preview
            );
        }
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!("Config file already exists: {:?} (use --force)", path);
            }
            app.settings.save_to(&path)?;
            println!("{} Wrote {:?}", "✓".green(), path);
        }
    }
    Ok(())
}
