use rig::{agent::Agent, client::CompletionClient, providers::openrouter};

/// Builds an OpenRouter agent for `model` with the given system preamble.
pub fn get_llm_agent(
    api_key: &str,
    model: &str,
    preamble: &str,
) -> anyhow::Result<Agent<openrouter::CompletionModel>> {
    if api_key.trim().is_empty() {
        anyhow::bail!("OPENROUTER_API_KEY not set");
    }
    let client = openrouter::Client::new(api_key);
    let agent = client.agent(model).preamble(preamble).build();
    Ok(agent)
}
