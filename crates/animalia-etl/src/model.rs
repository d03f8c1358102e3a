//! Canonical record types shared across the pipeline stages

use serde::{Deserialize, Serialize};

/// IUCN conservation status categories.
///
/// The fixed enumeration the validator enforces for `statutUICN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IucnStatus {
    /// Extinct
    EX,
    /// Extinct in the Wild
    EW,
    /// Critically Endangered
    CR,
    /// Endangered
    EN,
    /// Vulnerable
    VU,
    /// Near Threatened
    NT,
    /// Least Concern
    LC,
    /// Data Deficient
    DD,
}

impl IucnStatus {
    /// All valid status codes, in conventional threat order.
    pub const ALL: [IucnStatus; 8] = [
        IucnStatus::EX,
        IucnStatus::EW,
        IucnStatus::CR,
        IucnStatus::EN,
        IucnStatus::VU,
        IucnStatus::NT,
        IucnStatus::LC,
        IucnStatus::DD,
    ];

    /// Comma-separated list of valid codes, for error messages.
    pub fn valid_codes() -> String {
        Self::ALL
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::str::FromStr for IucnStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EX" => Ok(IucnStatus::EX),
            "EW" => Ok(IucnStatus::EW),
            "CR" => Ok(IucnStatus::CR),
            "EN" => Ok(IucnStatus::EN),
            "VU" => Ok(IucnStatus::VU),
            "NT" => Ok(IucnStatus::NT),
            "LC" => Ok(IucnStatus::LC),
            "DD" => Ok(IucnStatus::DD),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for IucnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            IucnStatus::EX => "EX",
            IucnStatus::EW => "EW",
            IucnStatus::CR => "CR",
            IucnStatus::EN => "EN",
            IucnStatus::VU => "VU",
            IucnStatus::NT => "NT",
            IucnStatus::LC => "LC",
            IucnStatus::DD => "DD",
        };
        write!(f, "{}", code)
    }
}

/// A canonical species record.
///
/// This is the shape shared by the normalized, validated, and sent artifacts.
/// Field declaration order is the stable field order of the JSON artifacts;
/// the serde names are the literal external names the target API expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    /// Scientific (binomial) name — the unique record key
    pub nom: String,

    /// Vernacular name
    pub nom_commun: Option<String>,

    /// Taxonomic rank (species, genus, ...)
    pub rang: Option<String>,

    /// IUCN conservation status
    #[serde(rename = "statutUICN")]
    pub statut_uicn: Option<IucnStatus>,

    /// Taxonomic order
    pub ordre: Option<String>,

    /// Taxonomic family
    pub famille: Option<String>,

    /// Taxonomic genus
    pub genre: Option<String>,

    /// Free-text description
    pub descriptions: Option<String>,

    /// Image URL (not populated by GBIF)
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
}

impl Animal {
    /// Create a record carrying only the scientific name.
    pub fn named(nom: impl Into<String>) -> Self {
        Self {
            nom: nom.into(),
            nom_commun: None,
            rang: None,
            statut_uicn: None,
            ordre: None,
            famille: None,
            genre: None,
            descriptions: None,
            image_url: None,
        }
    }
}
