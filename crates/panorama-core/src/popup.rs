//! Popup markup for point-of-interest markers.
//!
//! Markup is rendered once per marker when features are attached and then
//! handed to the engine as static HTML. The default renderer uses a
//! `minijinja` template registered under an `.html` name, so every
//! interpolated value is HTML-escaped.

use minijinja::{Environment, context};
use panorama_types::PointOfInterest;

/// Errors produced while rendering popup markup.
#[derive(Debug, thiserror::Error)]
pub enum PopupError {
    /// The template could not be registered or rendered.
    #[error("popup template error: {0}")]
    Template(String),
}

/// Turns a point of interest into popup markup.
pub trait PopupRenderer: Send {
    /// Render the popup shown when the point's marker is clicked.
    ///
    /// # Errors
    ///
    /// Returns [`PopupError`] if the markup cannot be produced.
    fn render(&self, point: &PointOfInterest) -> Result<String, PopupError>;
}

const POPUP_TEMPLATE_NAME: &str = "popup.html";

const DEFAULT_POPUP_TEMPLATE: &str = r#"<div class="poi-popup">
{%- if image %}
  <img src="{{ image }}" style="width: 100%; border-radius: 0.75rem;">
{%- endif %}
  <div>
    <div>
      <h2>{{ title }}</h2>
      <div>{{ info_text }}</div>
    </div>
{%- if url %}
    <div>
      <a href="{{ url }}">Learn More &gt;</a>
    </div>
{%- endif %}
  </div>
</div>"#;

/// Popup renderer backed by a `minijinja` template.
pub struct TemplatePopupRenderer {
    env: Environment<'static>,
}

impl TemplatePopupRenderer {
    /// Create a renderer using the built-in popup layout.
    ///
    /// # Errors
    ///
    /// Returns [`PopupError::Template`] if the built-in template fails to
    /// compile.
    pub fn new() -> Result<Self, PopupError> {
        Self::with_template(DEFAULT_POPUP_TEMPLATE.to_owned())
    }

    /// Create a renderer from custom template source.
    ///
    /// The template sees `title`, `info_text`, `image` and `url`; the last
    /// two are `none` when the point does not carry them.
    ///
    /// # Errors
    ///
    /// Returns [`PopupError::Template`] if the source fails to compile.
    pub fn with_template(source: String) -> Result<Self, PopupError> {
        let mut env = Environment::new();
        env.add_template_owned(POPUP_TEMPLATE_NAME, source)
            .map_err(|e| PopupError::Template(format!("failed to add popup template: {e}")))?;
        Ok(Self { env })
    }
}

impl PopupRenderer for TemplatePopupRenderer {
    fn render(&self, point: &PointOfInterest) -> Result<String, PopupError> {
        self.env
            .get_template(POPUP_TEMPLATE_NAME)
            .map_err(|e| PopupError::Template(format!("missing popup template: {e}")))?
            .render(context! {
                title => point.title.as_str(),
                info_text => point.info_text.as_deref().unwrap_or(""),
                image => point.image.as_deref(),
                url => point.url.as_deref(),
            })
            .map_err(|e| PopupError::Template(format!("popup render failed: {e}")))
    }
}
