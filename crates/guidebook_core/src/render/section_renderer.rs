//! Stored-section to display-structure mapping.
//!
//! # Responsibility
//! - Map each stored section to one display element by type.
//! - Flatten display elements to visible plain text.
//!
//! # Invariants
//! - Pure: no gateway access, no mutation of the input.
//! - Unknown section shapes render as nothing.

use crate::model::block::{BlockBody, StoreLabel, StoredSection};
use once_cell::sync::Lazy;
use regex::Regex;

static URL_HOST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[a-zA-Z][a-zA-Z0-9+.-]*://)?(?:www\.|m\.)?([^/:?#\s]+)")
        .expect("valid url host regex")
});

/// Icon shown next to a callout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalloutIcon {
    Lightbulb,
}

/// Link with visible text and an optional target.
///
/// `href` is `None` when the stored URL is blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLink {
    pub text: String,
    pub href: Option<String>,
}

/// App-store download badge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreBadge {
    pub store: StoreLabel,
    /// Accessible badge text.
    pub alt: &'static str,
    pub href: Option<String>,
}

/// Social network a link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialPlatform {
    Facebook,
    Instagram,
    X,
    LinkedIn,
    YouTube,
    TikTok,
    Other,
}

/// Social link with a detected platform icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialLink {
    pub platform: SocialPlatform,
    pub link: RenderedLink,
}

/// One display element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedSection {
    Paragraph(String),
    Heading(String),
    Quote(String),
    Callout { icon: CalloutIcon, text: String },
    Figure { src: String, caption: Option<String> },
    BulletList(Vec<String>),
    Divider,
    AddressLinks(Vec<RenderedLink>),
    StoreBadges(Vec<StoreBadge>),
    DocumentLinks(Vec<RenderedLink>),
    SocialLinks(Vec<SocialLink>),
}

/// Renders stored sections in order, skipping unknown ones.
pub fn render_sections(sections: &[StoredSection]) -> Vec<RenderedSection> {
    sections
        .iter()
        .filter_map(StoredSection::as_known)
        .filter_map(|section| render_body(section.body()))
        .collect()
}

/// Visible text of rendered output, one element per line group.
pub fn plain_text(rendered: &[RenderedSection]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for section in rendered {
        match section {
            RenderedSection::Paragraph(text)
            | RenderedSection::Heading(text)
            | RenderedSection::Quote(text)
            | RenderedSection::Callout { text, .. } => lines.push(text.clone()),
            RenderedSection::Figure { caption, .. } => {
                if let Some(caption) = caption {
                    lines.push(caption.clone());
                }
            }
            RenderedSection::BulletList(items) => {
                lines.extend(items.iter().map(|item| format!("- {item}")));
            }
            RenderedSection::Divider => lines.push("---".to_string()),
            RenderedSection::AddressLinks(links) | RenderedSection::DocumentLinks(links) => {
                lines.extend(links.iter().map(|link| link.text.clone()));
            }
            RenderedSection::StoreBadges(badges) => {
                lines.extend(badges.iter().map(|badge| badge.alt.to_string()));
            }
            RenderedSection::SocialLinks(links) => {
                lines.extend(links.iter().map(|social| social.link.text.clone()));
            }
        }
    }
    lines.join("\n")
}

/// Detects the social platform from a URL host.
pub fn detect_platform(url: &str) -> SocialPlatform {
    let Some(host) = URL_HOST_RE
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
    else {
        return SocialPlatform::Other;
    };

    let matches = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));
    if matches("facebook.com") || matches("fb.com") {
        SocialPlatform::Facebook
    } else if matches("instagram.com") {
        SocialPlatform::Instagram
    } else if matches("twitter.com") || matches("x.com") {
        SocialPlatform::X
    } else if matches("linkedin.com") {
        SocialPlatform::LinkedIn
    } else if matches("youtube.com") || matches("youtu.be") {
        SocialPlatform::YouTube
    } else if matches("tiktok.com") {
        SocialPlatform::TikTok
    } else {
        SocialPlatform::Other
    }
}

fn render_body(body: &BlockBody) -> Option<RenderedSection> {
    let rendered = match body {
        BlockBody::Text { content } => RenderedSection::Paragraph(content.clone()),
        BlockBody::Heading { content } => RenderedSection::Heading(content.clone()),
        BlockBody::Quote { content } => RenderedSection::Quote(content.clone()),
        BlockBody::Tip { content } => RenderedSection::Callout {
            icon: CalloutIcon::Lightbulb,
            text: content.clone(),
        },
        // Without a source only the caption is left to show.
        BlockBody::Image(image) if image.url.trim().is_empty() => {
            RenderedSection::Paragraph(non_blank(&image.caption)?)
        }
        BlockBody::Image(image) => RenderedSection::Figure {
            src: image.url.clone(),
            caption: non_blank(&image.caption),
        },
        BlockBody::List { items } => RenderedSection::BulletList(
            items
                .iter()
                .filter(|item| !item.trim().is_empty())
                .cloned()
                .collect(),
        ),
        BlockBody::Delimiter => RenderedSection::Divider,
        BlockBody::Links { items } => RenderedSection::AddressLinks(
            items
                .iter()
                .map(|item| link(&item.name, &item.url))
                .collect(),
        ),
        BlockBody::AppLinks { items } => RenderedSection::StoreBadges(
            items
                .iter()
                .map(|item| StoreBadge {
                    store: item.label,
                    alt: badge_alt(item.label),
                    href: non_blank(&item.url),
                })
                .collect(),
        ),
        BlockBody::PdfLinks { items } => RenderedSection::DocumentLinks(
            items
                .iter()
                .map(|item| link(&item.label, &item.url))
                .collect(),
        ),
        BlockBody::SocialLinks { items } => RenderedSection::SocialLinks(
            items
                .iter()
                .map(|item| SocialLink {
                    platform: detect_platform(&item.url),
                    link: link(&item.name, &item.url),
                })
                .collect(),
        ),
    };
    Some(rendered)
}

fn badge_alt(store: StoreLabel) -> &'static str {
    match store {
        StoreLabel::PlayStore => "Get it on Google Play",
        StoreLabel::AppStore => "Download on the App Store",
    }
}

fn link(text: &str, url: &str) -> RenderedLink {
    RenderedLink {
        text: if text.trim().is_empty() {
            url.to_string()
        } else {
            text.to_string()
        },
        href: non_blank(url),
    }
}

fn non_blank(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
