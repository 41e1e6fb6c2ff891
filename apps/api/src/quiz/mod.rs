//! Design-preference quiz: each question shows an image tied to one design
//! style; the visitor likes or skips it and the tally recommends a style.

pub mod handlers;
pub mod scoring;

/// Styles inserted on first boot: (slug, name, description).
pub const DEFAULT_STYLES: &[(&str, &str, &str)] = &[
    (
        "minimalist",
        "Minimalist",
        "Clean lines, open space and a restrained palette.",
    ),
    (
        "scandinavian",
        "Scandinavian",
        "Light woods, soft textiles and bright, functional rooms.",
    ),
    (
        "industrial",
        "Industrial",
        "Exposed brick, steel and raw concrete finishes.",
    ),
    (
        "japandi",
        "Japandi",
        "Japanese calm meets Nordic warmth in natural materials.",
    ),
    (
        "classic",
        "Classic",
        "Mouldings, symmetry and timeless detailing.",
    ),
];
