use tera::Tera;

/// Tera-backed template engine for the prompts sent with every chat turn.
pub struct TeraEngine {
    tera: Tera,
}

impl TeraEngine {
    /// Create with inline templates (no filesystem).
    pub fn new() -> Self {
        Self {
            tera: Tera::default(),
        }
    }

    /// Register a template from a string. Replaces any template of that name.
    pub fn add_template(&mut self, name: &str, content: &str) -> anyhow::Result<()> {
        self.tera.add_raw_template(name, content)?;
        Ok(())
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|registered| registered == name)
    }

    /// Render a named template with the given context.
    pub fn render(&self, template_name: &str, context: &tera::Context) -> anyhow::Result<String> {
        let rendered = self.tera.render(template_name, context)?;
        Ok(rendered)
    }
}

impl Default for TeraEngine {
    fn default() -> Self {
        Self::new()
    }
}
