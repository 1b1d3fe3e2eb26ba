//! Semantic locators for the review panel.
//!
//! Harvesting logic never spells out page markup. It asks for a [`Locator`]
//! by meaning ("the load-more button", "the date inside a review") and the
//! [`LocatorTable`] resolves it to a concrete [`Target`]. When the storefront
//! changes its markup, only the table changes, and the table can be
//! overridden from the configuration file.

use crate::types::RatingTier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder in the rating-filter target replaced by the tier's filter id.
pub const FILTER_ID_PLACEHOLDER: &str = "{id}";

/// Semantic name of an element on the product page or review panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Link on the product page that opens the review panel.
    ReviewsLink,
    /// One review in the panel.
    CommentItem,
    /// Review text, inside a [`Locator::CommentItem`].
    CommentContent,
    /// Review date, inside a [`Locator::CommentItem`].
    CommentDate,
    /// "Useful" vote button, inside a [`Locator::CommentItem`].
    LikeButton,
    /// Control that requests the next page of reviews.
    LoadMoreButton,
    /// Control that opens the rating filter menu.
    RatingMenu,
    /// Filter entry for one rating tier.
    RatingFilter(RatingTier),
}

impl Locator {
    /// Stable snake_case name, as used in the configuration file.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReviewsLink => "reviews_link",
            Self::CommentItem => "comment_item",
            Self::CommentContent => "comment_content",
            Self::CommentDate => "comment_date",
            Self::LikeButton => "like_button",
            Self::LoadMoreButton => "load_more_button",
            Self::RatingMenu => "rating_menu",
            Self::RatingFilter(_) => "rating_filter",
        }
    }
}

/// A concrete way to find an element: a CSS selector, optionally narrowed to
/// elements whose visible text contains a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Target {
    Css { selector: String },
    Text { selector: String, label: String },
}

impl Target {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css {
            selector: selector.into(),
        }
    }

    pub fn text(selector: impl Into<String>, label: impl Into<String>) -> Self {
        Self::Text {
            selector: selector.into(),
            label: label.into(),
        }
    }

    pub fn selector(&self) -> &str {
        match self {
            Self::Css { selector } | Self::Text { selector, .. } => selector,
        }
    }

    /// Text the element must contain, if any.
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Css { .. } => None,
            Self::Text { label, .. } => Some(label),
        }
    }

    fn substitute(&self, placeholder: &str, value: &str) -> Self {
        match self {
            Self::Css { selector } => Self::css(selector.replace(placeholder, value)),
            Self::Text { selector, label } => Self::text(
                selector.replace(placeholder, value),
                label.replace(placeholder, value),
            ),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css { selector } => write!(f, "{selector}"),
            Self::Text { selector, label } => write!(f, "{selector}:has-text(\"{label}\")"),
        }
    }
}

/// Mapping from every [`Locator`] to the markup of the storefront.
///
/// Defaults match the storefront's review panel at the time of writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorTable {
    pub reviews_link: Target,
    pub comment_item: Target,
    pub comment_content: Target,
    pub comment_date: Target,
    pub like_button: Target,
    pub load_more_button: Target,
    pub rating_menu: Target,
    /// Must contain [`FILTER_ID_PLACEHOLDER`].
    pub rating_filter: Target,
}

impl Default for LocatorTable {
    fn default() -> Self {
        Self {
            reviews_link: Target::text("a", "opiniones"),
            comment_item: Target::css(r#"article[data-testid="comment-component"]"#),
            comment_content: Target::css(r#"[data-testid="comment-content-component"]"#),
            comment_date: Target::css(".ui-review-capability-comments__comment__date"),
            like_button: Target::css(r#"button[data-testid="like-button"]"#),
            load_more_button: Target::text("button", "Ver más comentarios"),
            rating_menu: Target::text("span", "Calificación"),
            rating_filter: Target::css(r#"[data-testid="filterItem-rating-{id}"]"#),
        }
    }
}

impl LocatorTable {
    /// Resolve a semantic locator to its target.
    pub fn locate(&self, locator: Locator) -> Target {
        match locator {
            Locator::ReviewsLink => self.reviews_link.clone(),
            Locator::CommentItem => self.comment_item.clone(),
            Locator::CommentContent => self.comment_content.clone(),
            Locator::CommentDate => self.comment_date.clone(),
            Locator::LikeButton => self.like_button.clone(),
            Locator::LoadMoreButton => self.load_more_button.clone(),
            Locator::RatingMenu => self.rating_menu.clone(),
            Locator::RatingFilter(tier) => self
                .rating_filter
                .substitute(FILTER_ID_PLACEHOLDER, &tier.filter_id().to_string()),
        }
    }
}
