//! Backdrop
//!
//! The persistent background behind the content region: its color follows
//! the page stylesheet, and opaque effect plug-ins attach to it.

use crate::config::BackdropConfig;
use drift_dom::css::BASE_BG_COLOR;
use drift_dom::Surface;

/// Effect plug-in error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EffectError {
    #[error("Effect {name} failed to attach: {message}")]
    Attach { name: String, message: String },

    #[error("Effect {0} is already attached")]
    AlreadyAttached(String),
}

/// Background effect plug-in
///
/// Effects render on their own; the engine only attaches them on start
/// and detaches them on shutdown.
pub trait BackdropEffect {
    fn name(&self) -> &str;

    fn attach(&mut self, surface: &mut dyn Surface) -> Result<(), EffectError>;

    fn detach(&mut self, surface: &mut dyn Surface);
}

/// Effect that occupies a named backdrop layer
#[derive(Debug, Clone)]
pub struct LayerEffect {
    name: String,
}

impl LayerEffect {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string() }
    }
}

impl BackdropEffect for LayerEffect {
    fn name(&self) -> &str {
        &self.name
    }

    fn attach(&mut self, surface: &mut dyn Surface) -> Result<(), EffectError> {
        if surface.insert_layer(&self.name) {
            Ok(())
        } else {
            Err(EffectError::AlreadyAttached(self.name.clone()))
        }
    }

    fn detach(&mut self, surface: &mut dyn Surface) {
        surface.remove_layer(&self.name);
    }
}

/// Background color and effect host
pub struct Backdrop {
    default_color: String,
    error_color: String,
    effects: Vec<Box<dyn BackdropEffect>>,
    attached: Vec<usize>,
}

impl Backdrop {
    /// Backdrop with a [`LayerEffect`] for every configured effect name
    pub fn new(config: &BackdropConfig) -> Self {
        Self {
            default_color: config.default_color.clone(),
            error_color: config.error_color.clone(),
            effects: config
                .effects
                .iter()
                .map(|name| Box::new(LayerEffect::new(name)) as Box<dyn BackdropEffect>)
                .collect(),
            attached: Vec::new(),
        }
    }

    pub fn add_effect(&mut self, effect: Box<dyn BackdropEffect>) {
        self.effects.push(effect);
    }

    /// Attach every effect not yet attached; returns the number attached
    pub fn attach_effects(&mut self, surface: &mut dyn Surface) -> usize {
        let mut count = 0;
        for (index, effect) in self.effects.iter_mut().enumerate() {
            if self.attached.contains(&index) {
                continue;
            }
            match effect.attach(surface) {
                Ok(()) => {
                    tracing::debug!(effect = effect.name(), "Attached backdrop effect");
                    self.attached.push(index);
                    count += 1;
                }
                Err(err) => tracing::warn!("Backdrop effect skipped: {}", err),
            }
        }
        count
    }

    pub fn detach_effects(&mut self, surface: &mut dyn Surface) {
        for index in self.attached.drain(..) {
            if let Some(effect) = self.effects.get_mut(index) {
                effect.detach(surface);
            }
        }
    }

    /// Names of attached effects
    pub fn attached_effects(&self) -> Vec<&str> {
        self.attached
            .iter()
            .filter_map(|&i| self.effects.get(i))
            .map(|e| e.name())
            .collect()
    }

    /// Set the color the attached styles declare, else the default
    pub fn pull_color(&self, surface: &mut dyn Surface) -> String {
        let color = surface
            .computed_property(BASE_BG_COLOR)
            .unwrap_or_else(|| self.default_color.clone());
        surface.set_background_color(&color);
        color
    }

    pub fn reset(&self, surface: &mut dyn Surface) {
        surface.set_background_color(&self.default_color);
    }

    pub fn flash_error(&self, surface: &mut dyn Surface) {
        surface.set_background_color(&self.error_color);
    }
}

impl std::fmt::Debug for Backdrop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backdrop")
            .field("default_color", &self.default_color)
            .field("error_color", &self.error_color)
            .field("effects", &self.effects.iter().map(|e| e.name()).collect::<Vec<_>>())
            .field("attached", &self.attached)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_dom::MemorySurface;

    #[test]
    fn test_pull_color_uses_stylesheet_then_default() {
        let backdrop = Backdrop::new(&BackdropConfig::default());
        let mut surface = MemorySurface::new();

        assert_eq!(backdrop.pull_color(&mut surface), "#171935");
        surface.attach_style("content-style-projects", ":root { --base-bg-color: #0b2e1f; }");
        assert_eq!(backdrop.pull_color(&mut surface), "#0b2e1f");
        assert_eq!(surface.background_color().as_deref(), Some("#0b2e1f"));
    }

    #[test]
    fn test_flash_error() {
        let backdrop = Backdrop::new(&BackdropConfig::default());
        let mut surface = MemorySurface::new();
        backdrop.flash_error(&mut surface);
        assert_eq!(surface.background_color().as_deref(), Some("#5c1a1a"));
    }

    #[test]
    fn test_effects_attach_once() {
        let mut backdrop = Backdrop::new(&BackdropConfig::default());
        let mut surface = MemorySurface::new();

        assert_eq!(backdrop.attach_effects(&mut surface), 2);
        assert_eq!(backdrop.attach_effects(&mut surface), 0);
        assert_eq!(surface.layers(), ["flat-bg".to_string(), "marine-snow".to_string()]);

        backdrop.detach_effects(&mut surface);
        assert!(surface.layers().is_empty());
        assert!(backdrop.attached_effects().is_empty());
    }
}
