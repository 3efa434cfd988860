use super::engine::TeraEngine;
use super::store::SystemPrompt;
use crate::persona::Character;
use tera::Context;

const CHARACTER_PROMPT_TEMPLATE: &str = "\
你是{{ name }}。请始终以{{ name }}的身份和用户聊天，不要提及自己是AI。
{% if description %}
## 角色简介
{{ description }}
{% endif %}\
{% if personality %}
## 性格
{{ personality }}
{% endif %}\
{% if scenario %}
## 场景
{{ scenario }}
{% endif %}\
{% for instruction in instructions %}
{{ instruction }}
{% endfor %}";

const CHARACTER_PROMPT_NAME: &str = "character_system";

fn ensure_defaults(engine: &mut TeraEngine) -> anyhow::Result<()> {
    if !engine.has_template(CHARACTER_PROMPT_NAME) {
        engine.add_template(CHARACTER_PROMPT_NAME, CHARACTER_PROMPT_TEMPLATE)?;
    }
    Ok(())
}

/// Render the system prompt for `character`, followed by every enabled prompt.
pub fn build_system_prompt(
    engine: &mut TeraEngine,
    character: &Character,
    prompts: &[SystemPrompt],
) -> anyhow::Result<String> {
    ensure_defaults(engine)?;

    let instructions: Vec<&str> = prompts
        .iter()
        .filter(|prompt| prompt.enabled)
        .map(|prompt| prompt.content.as_str())
        .collect();

    let mut ctx = Context::new();
    ctx.insert("name", &character.name);
    ctx.insert("description", &character.description);
    ctx.insert("personality", &character.personality);
    ctx.insert("scenario", &character.scenario);
    ctx.insert("instructions", &instructions);

    let rendered = engine.render(CHARACTER_PROMPT_NAME, &ctx)?;
    Ok(rendered.trim().to_string())
}
