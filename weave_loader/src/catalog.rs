//! Variables, technologies, models, scenarios and countries of the PECD
//! database.

use serde::Serialize;

/// Technology code of variables that have no technology table.
pub const NO_TECHNOLOGY: &str = "NA";

/// Suggested range and default for a threshold on a climate variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdHint {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
}

/// A meteorological variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClimateVariable {
    pub code: &'static str,
    pub name: &'static str,
    pub units: &'static str,
    pub threshold: ThresholdHint,
}

/// An energy (capacity factor) variable and its technologies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyVariable {
    pub code: &'static str,
    pub name: &'static str,
    /// `(code, description)` pairs.
    pub technologies: &'static [(&'static str, &'static str)],
}

/// Either kind of catalogued variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Variable {
    Climate(&'static ClimateVariable),
    Energy(&'static EnergyVariable),
}

impl Variable {
    /// Short code, e.g. `"TA"`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Climate(v) => v.code,
            Self::Energy(v) => v.code,
        }
    }

    /// Long name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Climate(v) => v.name,
            Self::Energy(v) => v.name,
        }
    }
}

pub const CLIMATE_VARIABLES: &[ClimateVariable] = &[
    ClimateVariable {
        code: "10WS",
        name: "10m wind speed",
        units: "m/s",
        threshold: ThresholdHint { min: 0.0, max: 30.0, step: 0.5, default: 3.5 },
    },
    ClimateVariable {
        code: "100WS",
        name: "100m wind speed",
        units: "m/s",
        threshold: ThresholdHint { min: 0.0, max: 30.0, step: 1.0, default: 3.5 },
    },
    ClimateVariable {
        code: "GHI",
        name: "Surface solar radiation downwards",
        units: "W/m²",
        threshold: ThresholdHint { min: 0.0, max: 1000.0, step: 50.0, default: 300.0 },
    },
    ClimateVariable {
        code: "TA",
        name: "2m temperature",
        units: "°C",
        threshold: ThresholdHint { min: -10.0, max: 50.0, step: 1.0, default: 5.0 },
    },
    ClimateVariable {
        code: "TP",
        name: "Total precipitation",
        units: "mm",
        threshold: ThresholdHint { min: 0.0, max: 1000.0, step: 50.0, default: 100.0 },
    },
];

pub const ENERGY_VARIABLES: &[EnergyVariable] = &[
    EnergyVariable {
        code: "SPV",
        name: "Solar generation capacity factor",
        technologies: &[
            ("60", "Industrial rooftop"),
            ("61", "Residential rooftop"),
            ("62", "Utility-scale fixed"),
            ("63", "Utility-scale 1-axis tracking"),
        ],
    },
    EnergyVariable {
        code: "WOF",
        name: "Wind power offshore capacity factor",
        technologies: &[
            ("20", "Existing technologies"),
            ("21", "SP316 HH155"),
            ("22", "SP370 HH155"),
        ],
    },
    EnergyVariable {
        code: "WON",
        name: "Wind power onshore capacity factor",
        technologies: &[
            ("30", "Existing technologies"),
            ("31", "SP199 HH100"),
            ("32", "SP199 HH150"),
            ("33", "SP199 HH200"),
            ("34", "SP277 HH100"),
            ("35", "SP277 HH150"),
            ("36", "SP277 HH200"),
            ("37", "SP335 HH100"),
            ("38", "SP335 HH150"),
            ("39", "SP335 HH200"),
        ],
    },
];

/// Model labels as they appear once file names are parsed.
pub const MODELS: &[&str] = &[
    "ERA5", "AWI-_AWCM", "BCC-_BCCS", "CMCC_CMR5", "ECEC_ECE3", "MPI-_MEHR", "MRI-_MRM2",
];

pub const SCENARIOS: &[&str] = &["historical", "SP126", "SP245", "SP370", "SP585"];

/// `(code, description)` of the aggregation frequencies.
pub const FREQUENCIES: &[(&str, &str)] = &[
    ("H", "Hourly"),
    ("D", "Daily"),
    ("M", "Monthly"),
    ("Y", "Yearly"),
];

pub const COUNTRIES: &[(&str, &str)] = &[
    ("AL", "Albania"),
    ("AT", "Austria"),
    ("BA", "Bosnia and Herzegovina"),
    ("BE", "Belgium"),
    ("BG", "Bulgaria"),
    ("CH", "Switzerland"),
    ("CY", "Cyprus"),
    ("CZ", "Czech Republic"),
    ("DE", "Germany"),
    ("DK", "Denmark"),
    ("DZ", "Algeria"),
    ("EE", "Estonia"),
    ("EG", "Egypt"),
    ("EH", "Western Sahara"),
    ("EL", "Greece"),
    ("ES", "Spain"),
    ("FI", "Finland"),
    ("FR", "France"),
    ("HR", "Croatia"),
    ("HU", "Hungary"),
    ("IE", "Ireland"),
    ("IL", "Israel"),
    ("IS", "Iceland"),
    ("IT", "Italy"),
    ("JO", "Jordan"),
    ("LB", "Lebanon"),
    ("LI", "Liechtenstein"),
    ("LT", "Lithuania"),
    ("LU", "Luxembourg"),
    ("LV", "Latvia"),
    ("LY", "Libya"),
    ("MA", "Morocco"),
    ("MD", "Moldova"),
    ("ME", "Montenegro"),
    ("MK", "North Macedonia"),
    ("MT", "Malta"),
    ("NL", "Netherlands"),
    ("NO", "Norway"),
    ("PL", "Poland"),
    ("PS", "State of Palestine"),
    ("PT", "Portugal"),
    ("RO", "Romania"),
    ("RS", "Serbia"),
    ("SE", "Sweden"),
    ("SI", "Slovenia"),
    ("SK", "Slovakia"),
    ("SY", "Syrian Arab Republic"),
    ("TN", "Tunisia"),
    ("TR", "Turkey"),
    ("UA", "Ukraine"),
    ("UK", "United Kingdom"),
    ("XK", "Kosovo"),
];

/// Looks a variable up by code.
pub fn variable(code: &str) -> Option<Variable> {
    CLIMATE_VARIABLES
        .iter()
        .find(|v| v.code == code)
        .map(Variable::Climate)
        .or_else(|| {
            ENERGY_VARIABLES
                .iter()
                .find(|v| v.code == code)
                .map(Variable::Energy)
        })
}

/// Default threshold suggested for a climate variable.
pub fn default_threshold(code: &str) -> Option<f64> {
    match variable(code)? {
        Variable::Climate(v) => Some(v.threshold.default),
        Variable::Energy(_) => None,
    }
}

/// Long name of the country a code or column name belongs to.
///
/// Columns of sub-national files carry the country code as a prefix
/// (`FR10`), so the first two characters decide.
pub fn country_name(code: &str) -> Option<&'static str> {
    let prefix = code.get(..2)?;
    COUNTRIES.iter().find(|(c, _)| *c == prefix).map(|(_, n)| *n)
}

pub fn is_known_scenario(label: &str) -> bool {
    SCENARIOS.contains(&label)
}

pub fn is_known_model(label: &str) -> bool {
    MODELS.contains(&label)
}

/// Technologies to load for `variable`.
///
/// Variables with a technology table get the requested codes that appear in
/// the table (the whole table when nothing is requested), in table order.
/// Every other variable gets the single [`NO_TECHNOLOGY`] code.
pub fn technologies_for(variable_code: &str, requested: Option<&[String]>) -> Vec<String> {
    let Some(Variable::Energy(v)) = variable(variable_code) else {
        return vec![NO_TECHNOLOGY.to_string()];
    };
    v.technologies
        .iter()
        .map(|(code, _)| *code)
        .filter(|code| requested.is_none_or(|r| r.iter().any(|t| t == code)))
        .map(str::to_string)
        .collect()
}
