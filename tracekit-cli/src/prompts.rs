use anyhow::Result;
use inquire::{Confirm, Select, Text};

use tracekit_core::{Priority, ResultStatus, TestCase};

/// Answers for a new requirement
pub struct NewRequirement {
    pub name: String,
    pub description: String,
    pub priority: Option<Priority>,
}

/// Prompts for a non-empty value
pub fn prompt_required(label: &str) -> Result<String> {
    loop {
        let value = Text::new(label).prompt()?;
        let value = value.trim();
        if !value.is_empty() {
            return Ok(value.to_string());
        }
        println!("A value is required.");
    }
}

/// Prompts for an optional priority; "(none)" leaves it unset
pub fn prompt_priority() -> Result<Option<Priority>> {
    let options = vec![
        "(none)".to_string(),
        Priority::Critical.to_string(),
        Priority::High.to_string(),
        Priority::Medium.to_string(),
        Priority::Low.to_string(),
    ];
    let choice = Select::new("Priority:", options).prompt()?;
    if choice == "(none)" {
        return Ok(None);
    }
    Ok(Some(choice.parse()?))
}

/// Prompts the user for a new requirement
pub fn prompt_new_requirement(next_code: &str) -> Result<NewRequirement> {
    println!("New requirement {}", next_code);
    let name = prompt_required("Name:")?;
    let description = Text::new("Description:").prompt()?;
    let priority = prompt_priority()?;

    Ok(NewRequirement {
        name,
        description,
        priority,
    })
}

/// Asks for the result of one test case
pub fn prompt_result(case: &TestCase) -> Result<ResultStatus> {
    let options = vec![
        ResultStatus::Passed,
        ResultStatus::Failed,
        ResultStatus::Blocked,
        ResultStatus::Skipped,
    ];
    let label = format!("{} - {}:", case.id, case.name);
    Ok(Select::new(&label, options).prompt()?)
}

pub fn confirm(message: &str) -> Result<bool> {
    Ok(Confirm::new(message).with_default(false).prompt()?)
}
