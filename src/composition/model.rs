use std::path::Path;

use anyhow::Context;
use serde::Deserialize as _;

use crate::foundation::error::{BannerError, BannerResult};

/// Maximum number of upline avatars rendered in the avatar row.
pub const MAX_UPLINES: usize = 5;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
/// Closed set of banner layout variants.
pub enum BannerCategory {
    /// Rank promotion.
    Rank,
    /// Bonanza / trip qualifier.
    Bonanza,
    /// Birthday wishes.
    Birthday,
    /// Work or wedding anniversary.
    Anniversary,
    /// Meeting or event announcement.
    Meeting,
    /// Festival greetings.
    Festival,
    /// Motivational quote.
    Motivational,
    /// Success story.
    Story,
}

impl BannerCategory {
    /// Every category, in declaration order.
    pub const ALL: [BannerCategory; 8] = [
        BannerCategory::Rank,
        BannerCategory::Bonanza,
        BannerCategory::Birthday,
        BannerCategory::Anniversary,
        BannerCategory::Meeting,
        BannerCategory::Festival,
        BannerCategory::Motivational,
        BannerCategory::Story,
    ];

    /// Stable lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            BannerCategory::Rank => "rank",
            BannerCategory::Bonanza => "bonanza",
            BannerCategory::Birthday => "birthday",
            BannerCategory::Anniversary => "anniversary",
            BannerCategory::Meeting => "meeting",
            BannerCategory::Festival => "festival",
            BannerCategory::Motivational => "motivational",
            BannerCategory::Story => "story",
        }
    }

    /// Parse a wire name; matching is case-insensitive and ignores surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
    }

    /// Fixed heading shown at the top of the category block.
    pub fn heading(self) -> &'static str {
        match self {
            BannerCategory::Rank => "CONGRATULATIONS",
            BannerCategory::Bonanza => "BONANZA WINNER",
            BannerCategory::Birthday => "HAPPY BIRTHDAY",
            BannerCategory::Anniversary => "HAPPY ANNIVERSARY",
            BannerCategory::Meeting => "MEETING",
            BannerCategory::Festival => "FESTIVAL GREETINGS",
            BannerCategory::Motivational => "THOUGHT OF THE DAY",
            BannerCategory::Story => "SUCCESS STORY",
        }
    }

    /// Mentor photo is suppressed for motivational and story banners.
    pub fn suppresses_mentor(self) -> bool {
        match self {
            BannerCategory::Motivational | BannerCategory::Story => true,
            BannerCategory::Rank
            | BannerCategory::Bonanza
            | BannerCategory::Birthday
            | BannerCategory::Anniversary
            | BannerCategory::Meeting
            | BannerCategory::Festival => false,
        }
    }

    /// Story banners omit the main achiever photo.
    pub fn shows_achiever_photo(self) -> bool {
        !matches!(self, BannerCategory::Story)
    }

    /// Story banners carry no contact/profile band.
    pub fn shows_contact_band(self) -> bool {
        !matches!(self, BannerCategory::Story)
    }
}

impl std::fmt::Display for BannerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
/// Category as received on the wire.
///
/// Unknown values are preserved rather than rejected so the rest of the banner still renders; the
/// category-specific block compiles to nothing for them.
pub enum CategoryTag {
    /// A recognised category.
    Known(BannerCategory),
    /// Any other string.
    Unrecognized(String),
}

impl CategoryTag {
    /// Return the recognised category, if any.
    pub fn known(&self) -> Option<BannerCategory> {
        match self {
            CategoryTag::Known(c) => Some(*c),
            CategoryTag::Unrecognized(_) => None,
        }
    }

    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            CategoryTag::Known(c) => c.as_str(),
            CategoryTag::Unrecognized(s) => s.as_str(),
        }
    }
}

impl From<BannerCategory> for CategoryTag {
    fn from(c: BannerCategory) -> Self {
        CategoryTag::Known(c)
    }
}

impl From<String> for CategoryTag {
    fn from(s: String) -> Self {
        match BannerCategory::parse(&s) {
            Some(c) => CategoryTag::Known(c),
            None => CategoryTag::Unrecognized(s),
        }
    }
}

impl From<CategoryTag> for String {
    fn from(tag: CategoryTag) -> Self {
        match tag {
            CategoryTag::Known(c) => c.as_str().to_string(),
            CategoryTag::Unrecognized(s) => s,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// Optional text content. A missing or blank field omits its visual element.
pub struct TextFields {
    /// Achiever display name.
    pub user_name: Option<String>,
    /// Team or city line.
    pub team_city: Option<String>,
    /// Cheque/income amount; accepts a JSON string or number.
    #[serde(deserialize_with = "de_string_or_number")]
    pub cheque_amount: Option<String>,
    /// Contact mobile number.
    pub mobile: Option<String>,
    /// Profile owner name shown in the contact band.
    pub profile_name: Option<String>,
    /// Profile owner rank shown in the contact band.
    pub profile_rank: Option<String>,
    /// Trip name for bonanza banners.
    pub trip_name: Option<String>,
    /// Free-form wish or message.
    pub message: Option<String>,
    /// Quote text.
    pub quote: Option<String>,
    /// Event title.
    pub event_title: Option<String>,
    /// Event date line.
    pub event_date: Option<String>,
    /// Event venue line.
    pub event_venue: Option<String>,
}

/// Treat blank strings the same as absent ones.
pub fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn de_string_or_number<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(de)?;
    match v {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// Optional image URIs. `None` skips the corresponding layer.
pub struct ImageRefs {
    /// Main achiever photo.
    pub achiever: Option<String>,
    /// Full-bleed background image.
    pub background: Option<String>,
    /// Mentor photo.
    pub mentor: Option<String>,
    /// Top-left logo.
    pub logo_left: Option<String>,
    /// Top-right logo.
    pub logo_right: Option<String>,
    /// Decorative congratulations artwork inside the category block.
    pub congrats_image: Option<String>,
}

impl ImageRefs {
    /// URIs in layer order (back to front).
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        [
            &self.background,
            &self.logo_left,
            &self.logo_right,
            &self.achiever,
            &self.congrats_image,
            &self.mentor,
        ]
        .into_iter()
        .filter_map(present)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// One entry of the upline avatar row.
pub struct Upline {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Avatar image; a placeholder circle is drawn when absent or unresolved.
    #[serde(default)]
    pub avatar_uri: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Percentage-positioned sticker. Unset fields fall back to the layout's sticker defaults.
pub struct StickerPlacement {
    /// Stable identifier.
    pub id: String,
    /// Sticker image.
    pub image_uri: String,
    /// Center X as percent of canvas width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_x: Option<f64>,
    /// Center Y as percent of canvas height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_y: Option<f64>,
    /// Multiplier against the base sticker size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    /// Clockwise rotation in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_deg: Option<f64>,
}

impl StickerPlacement {
    /// Sticker with every transform field left to the defaults.
    pub fn new(id: impl Into<String>, image_uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            image_uri: image_uri.into(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Complete declarative input to one render.
pub struct BannerDescriptor {
    /// Layout variant.
    pub category: CategoryTag,
    /// Text content.
    #[serde(default)]
    pub text_fields: TextFields,
    /// Image layers.
    #[serde(default)]
    pub image_refs: ImageRefs,
    /// Upline avatars, at most [`MAX_UPLINES`].
    #[serde(default)]
    pub uplines: Vec<Upline>,
    /// Stickers drawn above the photos.
    #[serde(default)]
    pub stickers: Vec<StickerPlacement>,
    /// Mirror the achiever photo horizontally.
    #[serde(default)]
    pub flip_achiever: bool,
    /// Mirror the mentor photo horizontally.
    #[serde(default)]
    pub flip_mentor: bool,
}

impl BannerDescriptor {
    /// Empty descriptor for `category`.
    pub fn new(category: impl Into<CategoryTag>) -> Self {
        Self {
            category: category.into(),
            text_fields: TextFields::default(),
            image_refs: ImageRefs::default(),
            uplines: Vec::new(),
            stickers: Vec::new(),
            flip_achiever: false,
            flip_mentor: false,
        }
    }

    /// Parse a descriptor from JSON text.
    pub fn from_json_str(s: &str) -> BannerResult<Self> {
        serde_json::from_str(s).map_err(|e| BannerError::serde(e.to_string()))
    }

    /// Read and parse a descriptor JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> BannerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read banner descriptor '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> BannerResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| BannerError::serde(e.to_string()))
    }

    /// Strict checks for callers that want to reject malformed input up front.
    ///
    /// Composition itself never fails; it degrades instead.
    pub fn validate(&self) -> BannerResult<()> {
        if let CategoryTag::Unrecognized(s) = &self.category {
            return Err(BannerError::validation(format!(
                "unrecognized banner category '{s}'"
            )));
        }
        if self.uplines.len() > MAX_UPLINES {
            return Err(BannerError::validation(format!(
                "at most {MAX_UPLINES} uplines are supported, got {}",
                self.uplines.len()
            )));
        }
        for s in &self.stickers {
            if s.image_uri.trim().is_empty() {
                return Err(BannerError::validation(format!(
                    "sticker '{}' has an empty image uri",
                    s.id
                )));
            }
            for (name, v) in [
                ("positionX", s.position_x),
                ("positionY", s.position_y),
                ("scale", s.scale),
                ("rotationDeg", s.rotation_deg),
            ] {
                if v.is_some_and(|v| !v.is_finite()) {
                    return Err(BannerError::validation(format!(
                        "sticker '{}' {name} must be finite",
                        s.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Every URI this descriptor needs, deduplicated, in first-use order.
    pub fn referenced_uris(&self) -> Vec<String> {
        let mut out = Vec::<String>::new();
        let mut push = |uri: &str| {
            if !out.iter().any(|u| u == uri) {
                out.push(uri.to_string());
            }
        };
        for uri in self.image_refs.iter() {
            push(uri);
        }
        for upline in self.uplines.iter().take(MAX_UPLINES) {
            if let Some(uri) = present(&upline.avatar_uri) {
                push(uri);
            }
        }
        for s in &self.stickers {
            let uri = s.image_uri.trim();
            if !uri.is_empty() {
                push(uri);
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/model.rs"]
mod tests;
