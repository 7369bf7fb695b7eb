use serde::Serialize;

/// Listing types accepted by the admin API. Every type other than
/// `Development` is "active-like": a single unit described by the
/// single-value bedroom/bathroom/size/price fields. Developments span a
/// range of unit types and use the paired min/max/from/to fields instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Active,
    Development,
    Land,
    HotDeal,
    OffMarket,
}

impl PropertyType {
    pub const ALL: [PropertyType; 5] = [
        Self::Active,
        Self::Development,
        Self::Land,
        Self::HotDeal,
        Self::OffMarket,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Development => "development",
            Self::Land => "land",
            Self::HotDeal => "hot_deal",
            Self::OffMarket => "off_market",
        }
    }

    /// Parse a canonical type token. Synonyms are the normalizer's job;
    /// this only accepts registry members.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(value.trim()))
    }

    pub fn is_active_like(self) -> bool {
        !matches!(self, Self::Development)
    }
}

pub const PROPERTY_TYPES: &[&str] = &["active", "development", "land", "hot_deal", "off_market"];
pub const STATUSES: &[&str] = &["for_sale", "for_rent", "sold", "rented", "coming_soon"];
pub const CURRENCIES: &[&str] = &["usd", "mxn", "eur"];
pub const CATEGORIES: &[&str] = &[
    "apartment",
    "villa",
    "house",
    "condo",
    "penthouse",
    "townhouse",
    "land",
    "commercial",
];
pub const FURNISHING: &[&str] = &["furnished", "semi_furnished", "unfurnished"];
pub const BEDROOMS: &[&str] = &["studio", "1", "2", "3", "4", "5+"];
pub const BATHROOMS: &[&str] = &["1", "1.5", "2", "2.5", "3", "3.5", "4", "4.5", "5+"];

/// Amenity/feature vocabulary in canonical casing. Matching is exact
/// case-insensitive, never fuzzy.
pub const TAGS: &[&str] = &[
    "Pool",
    "Gym",
    "Ocean View",
    "Beachfront",
    "Rooftop",
    "Concierge",
    "Cenote",
    "Jungle View",
    "Solar Panels",
    "Smart Home",
    "Pet Friendly",
    "Furnished",
    "Coworking",
    "EV Charging",
    "Gated Community",
    "Private Garden",
    "Jacuzzi",
    "BBQ Area",
];

/// Token synonyms applied after lowercase/underscore tokenization.
/// Left side is the legacy/regional token, right side the canonical one.
pub const ENUM_SYNONYMS: &[(&str, &str)] = &[
    ("active_properties", "active"),
    ("active_property", "active"),
    ("hot_deals", "hot_deal"),
    ("deal", "hot_deal"),
    ("deals", "hot_deal"),
    ("oferta", "hot_deal"),
    ("developments", "development"),
    ("pre_construction", "development"),
    ("lot", "land"),
    ("lots", "land"),
    ("sale", "for_sale"),
    ("rent", "for_rent"),
    ("rental", "for_rent"),
];

/// Identifier/derived/internal fields the server owns. Always stripped
/// from client-supplied drafts.
pub const SERVER_OWNED_FIELDS: &[&str] = &[
    "id",
    "slug",
    "created_at",
    "updated_at",
    "published_at",
    "author_id",
    "view_count",
    "main_image_id",
    "image_ids",
];

/// Deprecated singular predecessor of `property_categories`.
pub const LEGACY_CATEGORY_FIELD: &str = "property_category";

pub const CATEGORIES_FIELD: &str = "property_categories";
pub const PROPERTY_TYPE_FIELD: &str = "property_type";
pub const CONTENT_FIELD: &str = "content";
pub const TAGS_FIELD: &str = "tags";
pub const SHORT_DESCRIPTION_FIELD: &str = "short_description";
pub const MAP_URL_FIELD: &str = "map_url";

/// Minimum word count for `content` after markup stripping. A downstream
/// content-quality requirement, so falling short is an error, not advice.
pub const CONTENT_MIN_WORDS: usize = 250;

/// Host fragments recognized as map-provider links for `map_url`.
pub const MAP_URL_HOSTS: &[&str] = &[
    "google.com/maps",
    "goo.gl/maps",
    "maps.app.goo.gl",
    "openstreetmap.org",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    RichText,
    Number,
    Boolean,
    Enum(&'static [&'static str]),
    Bedrooms,
    Bathrooms,
    Categories,
    Tags,
}

impl FieldKind {
    pub fn allowed_values(self) -> Option<&'static [&'static str]> {
        match self {
            Self::Enum(values) => Some(values),
            Self::Bedrooms => Some(BEDROOMS),
            Self::Bathrooms => Some(BATHROOMS),
            Self::Categories => Some(CATEGORIES),
            _ => None,
        }
    }
}

/// Which property types a field may be non-null for. Developments are
/// range-priced; active-like listings are single units. Mixing the two
/// shapes corrupts downstream price/size display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applies {
    Always,
    ActiveLikeOnly,
    DevelopmentOnly,
}

impl Applies {
    pub fn allows(self, property_type: PropertyType) -> bool {
        match self {
            Self::Always => true,
            Self::ActiveLikeOnly => property_type.is_active_like(),
            Self::DevelopmentOnly => !property_type.is_active_like(),
        }
    }
}

/// One declarative field description. Both the normalizer and the
/// validator read `FIELDS` exclusively; no other table of enums, lengths,
/// or field sets exists.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub max_len: Option<usize>,
    pub required: bool,
    pub lowercase: bool,
    pub applies: Applies,
}

impl FieldSpec {
    const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            max_len: None,
            required: false,
            lowercase: false,
            applies: Applies::Always,
        }
    }

    const fn max_len(mut self, limit: usize) -> Self {
        self.max_len = Some(limit);
        self
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    const fn only(mut self, applies: Applies) -> Self {
        self.applies = applies;
        self
    }
}

/// The accepted-key whitelist with per-field rules. Length ceilings mirror
/// the persistence layer's column limits and must be kept in lockstep with
/// them.
pub const FIELDS: &[FieldSpec] = &[
    FieldSpec::new("title", FieldKind::Text).max_len(200).required(),
    FieldSpec::new("property_type", FieldKind::Enum(PROPERTY_TYPES)).required(),
    FieldSpec::new("status", FieldKind::Enum(STATUSES)).required(),
    FieldSpec::new("city", FieldKind::Text).max_len(80).required(),
    FieldSpec::new("country", FieldKind::Text).max_len(80).required(),
    FieldSpec::new("state", FieldKind::Text).max_len(80).lowercase(),
    FieldSpec::new("neighborhood", FieldKind::Text).max_len(120),
    FieldSpec::new("address", FieldKind::Text).max_len(300),
    FieldSpec::new("short_description", FieldKind::Text).max_len(300),
    FieldSpec::new("meta_title", FieldKind::Text).max_len(70),
    FieldSpec::new("meta_description", FieldKind::Text).max_len(160),
    FieldSpec::new("content", FieldKind::RichText),
    FieldSpec::new("currency", FieldKind::Enum(CURRENCIES)),
    FieldSpec::new("furnishing", FieldKind::Enum(FURNISHING)),
    FieldSpec::new("property_categories", FieldKind::Categories),
    FieldSpec::new("tags", FieldKind::Tags),
    FieldSpec::new("map_url", FieldKind::Text).max_len(500),
    FieldSpec::new("video_url", FieldKind::Text).max_len(500),
    FieldSpec::new("virtual_tour_url", FieldKind::Text).max_len(500),
    FieldSpec::new("year_built", FieldKind::Number),
    FieldSpec::new("maintenance_fee_usd", FieldKind::Number),
    FieldSpec::new("latitude", FieldKind::Number),
    FieldSpec::new("longitude", FieldKind::Number),
    FieldSpec::new("featured", FieldKind::Boolean),
    FieldSpec::new("beachfront", FieldKind::Boolean),
    FieldSpec::new("private_pool", FieldKind::Boolean),
    FieldSpec::new("pet_friendly", FieldKind::Boolean),
    FieldSpec::new("off_market_only", FieldKind::Boolean),
    FieldSpec::new("bedrooms", FieldKind::Bedrooms).only(Applies::ActiveLikeOnly),
    FieldSpec::new("bathrooms", FieldKind::Bathrooms).only(Applies::ActiveLikeOnly),
    FieldSpec::new("size_m2", FieldKind::Number).only(Applies::ActiveLikeOnly),
    FieldSpec::new("price_usd", FieldKind::Number).only(Applies::ActiveLikeOnly),
    FieldSpec::new("price_mxn", FieldKind::Number).only(Applies::ActiveLikeOnly),
    FieldSpec::new("bedrooms_min", FieldKind::Bedrooms).only(Applies::DevelopmentOnly),
    FieldSpec::new("bedrooms_max", FieldKind::Bedrooms).only(Applies::DevelopmentOnly),
    FieldSpec::new("bathrooms_min", FieldKind::Bathrooms).only(Applies::DevelopmentOnly),
    FieldSpec::new("bathrooms_max", FieldKind::Bathrooms).only(Applies::DevelopmentOnly),
    FieldSpec::new("size_m2_min", FieldKind::Number).only(Applies::DevelopmentOnly),
    FieldSpec::new("size_m2_max", FieldKind::Number).only(Applies::DevelopmentOnly),
    FieldSpec::new("price_usd_from", FieldKind::Number).only(Applies::DevelopmentOnly),
    FieldSpec::new("price_usd_to", FieldKind::Number).only(Applies::DevelopmentOnly),
];

pub fn field(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|spec| spec.name == name)
}

pub fn is_known_key(name: &str) -> bool {
    field(name).is_some()
}

/// Exact case-insensitive lookup into the tag vocabulary, returning the
/// canonical casing on a hit.
pub fn canonical_tag(value: &str) -> Option<&'static str> {
    let trimmed = value.trim();
    TAGS.iter()
        .copied()
        .find(|tag| tag.eq_ignore_ascii_case(trimmed))
}

pub fn synonym(token: &str) -> Option<&'static str> {
    ENUM_SYNONYMS
        .iter()
        .find(|(legacy, _)| *legacy == token)
        .map(|(_, canonical)| *canonical)
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaSummary {
    pub property_types: &'static [&'static str],
    pub statuses: &'static [&'static str],
    pub currencies: &'static [&'static str],
    pub categories: &'static [&'static str],
    pub furnishing: &'static [&'static str],
    pub bedrooms: &'static [&'static str],
    pub bathrooms: &'static [&'static str],
    pub tags: &'static [&'static str],
    pub required_fields: Vec<&'static str>,
    pub accepted_fields: Vec<&'static str>,
    pub content_min_words: usize,
}

/// Registry dump for the `proptool schema` command.
pub fn summary() -> SchemaSummary {
    SchemaSummary {
        property_types: PROPERTY_TYPES,
        statuses: STATUSES,
        currencies: CURRENCIES,
        categories: CATEGORIES,
        furnishing: FURNISHING,
        bedrooms: BEDROOMS,
        bathrooms: BATHROOMS,
        tags: TAGS,
        required_fields: FIELDS
            .iter()
            .filter(|spec| spec.required)
            .map(|spec| spec.name)
            .collect(),
        accepted_fields: FIELDS.iter().map(|spec| spec.name).collect(),
        content_min_words: CONTENT_MIN_WORDS,
    }
}
