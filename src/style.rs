//! Colors and the explicit style policy handed to the graph.
//!
//! Nothing here reads ambient UI state: the editor passes a [`Theme`] in, and every
//! relationship color is resolved through [`StylePolicy`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::relationship::Relationship;

pub const DEFAULT_EDGE_WIDTH: f64 = 2.0;
pub const DEFAULT_BOX_STROKE_WIDTH: f64 = 1.0;
pub const DEFAULT_HANDLE_STROKE_WIDTH: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "opaque")]
    pub a: u8,
}

fn opaque() -> u8 {
    255
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// The handful of UI colors the core needs to fill in defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub foreground: Color,
    pub background: Color,
    pub focus: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            foreground: Color::rgb(0x21, 0x21, 0x21),
            background: Color::rgb(0xff, 0xff, 0xff),
            focus: Color::rgb(0x00, 0x6c, 0xff),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    pub fill_color: Color,
    pub stroke_color: Color,
    pub stroke_width: f64,
    pub handle_color: Color,
    pub handle_stroke_width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeStyle {
    pub color: Color,
    pub width: f64,
}

/// Relationship to color mapping plus the theme used for fallbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct StylePolicy {
    pub theme: Theme,
    pub edge_width: f64,
    colors: BTreeMap<Relationship, Color>,
}

impl Default for StylePolicy {
    fn default() -> Self {
        Self::with_theme(Theme::default())
    }
}

impl StylePolicy {
    pub fn with_theme(theme: Theme) -> Self {
        let colors = BTreeMap::from([
            (Relationship::Separated, Color::rgb(80, 1, 1)),
            (Relationship::Cohabitation, Color::rgb(8, 6, 151)),
            (Relationship::Friend, Color::rgb(15, 91, 5)),
            (Relationship::Hostile, Color::rgb(215, 38, 6)),
            (Relationship::Abuse, Color::rgb(6, 215, 183)),
        ]);

        Self {
            theme,
            edge_width: DEFAULT_EDGE_WIDTH,
            colors,
        }
    }

    /// Overrides the color used for one relationship kind.
    pub fn set_color(&mut self, relationship: Relationship, color: Color) {
        self.colors.insert(relationship, color);
    }

    pub fn fallback_color(&self) -> Color {
        self.theme.foreground
    }

    pub fn edge_color(&self, relationship: &Relationship) -> Color {
        self.colors
            .get(relationship)
            .copied()
            .unwrap_or_else(|| self.fallback_color())
    }

    pub fn edge_style(&self, relationship: &Relationship) -> EdgeStyle {
        EdgeStyle {
            color: self.edge_color(relationship),
            width: self.edge_width,
        }
    }

    pub fn node_style(&self) -> NodeStyle {
        NodeStyle {
            fill_color: self.theme.background,
            stroke_color: self.theme.foreground,
            stroke_width: DEFAULT_BOX_STROKE_WIDTH,
            handle_color: self.theme.foreground,
            handle_stroke_width: DEFAULT_HANDLE_STROKE_WIDTH,
        }
    }

    /// Handle color for a node the pointer is hovering.
    pub fn focused_handle(&self, mut style: NodeStyle) -> NodeStyle {
        style.handle_color = self.theme.focus;
        style
    }
}
