use anyhow::Result;
use pravator::cli::{actions, actions::Action, start};

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    // Start the program
    let (action, globals) = start()?;

    // Handle the action
    match action {
        Action::Apply { .. } => actions::apply::handle(action, &globals).await?,
        Action::Template { .. } => actions::template::handle(action, &globals).await?,
    }

    Ok(())
}
