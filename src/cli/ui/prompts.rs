use anyhow::Result;
use dialoguer::{Input, Select};

/// Yes/no question answered with the arrow keys
pub fn prompt_confirmation(prompt: &str, default_yes: bool) -> Result<bool> {
    let items = ["Yes", "No"];
    let selection = Select::new()
        .with_prompt(prompt)
        .items(&items)
        .default(if default_yes { 0 } else { 1 })
        .interact()?;
    Ok(selection == 0)
}

/// Use `value` when given, otherwise ask
pub fn prompt_or(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => Ok(Input::<String>::new().with_prompt(prompt).interact_text()?),
    }
}

/// Free text with the current value as default; empty answers allowed
pub fn prompt_field(label: &str, current: &str) -> Result<String> {
    Ok(Input::<String>::new()
        .with_prompt(label)
        .with_initial_text(current)
        .allow_empty(true)
        .interact_text()?)
}

/// Pick one entry; `None` when the list is empty
pub fn prompt_select<T: ToString>(prompt: &str, items: &[T]) -> Result<Option<usize>> {
    if items.is_empty() {
        return Ok(None);
    }
    let labels: Vec<String> = items.iter().map(ToString::to_string).collect();
    let selection = Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(Some(selection))
}

pub fn prompt_password(prompt: &str) -> Result<String> {
    Ok(rpassword::prompt_password(format!("{}: ", prompt))?)
}
