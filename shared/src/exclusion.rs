//! Warehouse and family exclusion policy (KLY GROUPE)
//!
//! Internal, transit and carrier warehouses and discontinued product families are
//! hidden from every listing, count and statistic. The lists are deploy-time policy:
//! changing them requires a release, never a database write.

/// Display-name marker of the reference warehouse whose minimum thresholds anchor
/// every low-stock and surplus decision.
pub const REFERENCE_WAREHOUSE_MARKER: &str = "KLY GENNEVILLIERS";

const EXCLUDED_WAREHOUSE_NAMES: &[&str] = &[
    "A jeter",
    "BG GROUPE",
    "CGL TRANSPORT",
    "DEPOT DE RETOUR",
    "ERLEC ENERGIE",
    "FM CMGT/ SAGATRANS",
    "GEODIS",
    "HEPPNER_VATINEL",
    "KLY ANCIEN",
    "KLY ATTENTE CONDITIONNEMENT",
    "KLY CONTROLE SANITAIRE",
    "KLY GROUPE SECONDAIRE",
    "KLY HORS WMS",
    "KLY KLYTOON",
    "LIVRAISON DIRECT",
    "MRBA TRANSPORT",
    "NE PAS UTILISER",
    "PLD EUROPE",
    "SAV",
    "TCL",
    "TCL GD",
    "TRANSIT PHOCEEN",
];

// Warehouse number 0 is Sage's placeholder row, never a physical location.
const EXCLUDED_WAREHOUSE_CODES: &[i32] = &[0];

const EXCLUDED_FAMILY_NAMES: &[&str] = &[
    "Bazar",
    "Confiserie bonbon TVA 20%",
    "Confiserie Choc TVA 5,50%",
    "Conserves",
    "Divers",
    "Éco-participations",
    "Épices",
    "Féculents",
    "Fruits secs",
    "GTB",
    "Liquide",
    "Parfumerie",
    "Prestations diverses",
    "Produits médicaux",
    "Sucres",
    "Textile",
    "Thés",
    "TVA",
];

const EXCLUDED_FAMILY_CODES: &[&str] = &[
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "16", "26", "27",
    "ZZ",
];

/// Exclusion rule set: two match axes (stable code, exact display name) per entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExclusionRules {
    pub warehouse_codes: &'static [i32],
    pub warehouse_names: &'static [&'static str],
    pub family_codes: &'static [&'static str],
    pub family_names: &'static [&'static str],
}

/// The policy in force for KLY GROUPE
pub const KLY_EXCLUSIONS: ExclusionRules = ExclusionRules {
    warehouse_codes: EXCLUDED_WAREHOUSE_CODES,
    warehouse_names: EXCLUDED_WAREHOUSE_NAMES,
    family_codes: EXCLUDED_FAMILY_CODES,
    family_names: EXCLUDED_FAMILY_NAMES,
};

impl Default for ExclusionRules {
    fn default() -> Self {
        KLY_EXCLUSIONS
    }
}

impl ExclusionRules {
    /// A warehouse is excluded when either its code or its trimmed display name matches.
    pub fn excludes_warehouse(&self, code: i32, name: &str) -> bool {
        let name = name.trim();
        self.warehouse_codes.contains(&code) || self.warehouse_names.contains(&name)
    }

    /// A family is excluded when either its code or its display name matches.
    /// An unknown display name only matches on the code axis.
    pub fn excludes_family(&self, code: &str, name: Option<&str>) -> bool {
        let code = code.trim();
        self.family_codes.contains(&code)
            || name
                .map(|n| self.family_names.contains(&n.trim()))
                .unwrap_or(false)
    }

    /// Owned copies for binding as query parameters
    pub fn warehouse_code_params(&self) -> Vec<i32> {
        self.warehouse_codes.to_vec()
    }

    pub fn warehouse_name_params(&self) -> Vec<String> {
        self.warehouse_names.iter().map(|s| s.to_string()).collect()
    }

    pub fn family_code_params(&self) -> Vec<String> {
        self.family_codes.iter().map(|s| s.to_string()).collect()
    }

    pub fn family_name_params(&self) -> Vec<String> {
        self.family_names.iter().map(|s| s.to_string()).collect()
    }
}

/// Case-insensitive substring match on [`REFERENCE_WAREHOUSE_MARKER`]
pub fn is_reference_warehouse(name: &str) -> bool {
    name.to_uppercase().contains(REFERENCE_WAREHOUSE_MARKER)
}

/// `LIKE` pattern matching the reference warehouse on an upper-cased name
pub fn reference_warehouse_pattern() -> String {
    format!("%{}%", REFERENCE_WAREHOUSE_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warehouse_matches_on_name_or_code() {
        let rules = KLY_EXCLUSIONS;
        assert!(rules.excludes_warehouse(42, "GEODIS"));
        assert!(rules.excludes_warehouse(42, "  TCL GD "));
        assert!(rules.excludes_warehouse(0, "Anything"));
        assert!(!rules.excludes_warehouse(1, "KLY GENNEVILLIERS"));
        // exact match only
        assert!(!rules.excludes_warehouse(5, "TCL NORD"));
        assert!(!rules.excludes_warehouse(5, "geodis"));
    }

    #[test]
    fn family_matches_on_name_or_code() {
        let rules = KLY_EXCLUSIONS;
        assert!(rules.excludes_family("ZZ", None));
        assert!(rules.excludes_family("16", Some("Nouveautés")));
        assert!(rules.excludes_family("BOIS", Some("Thés")));
        assert!(!rules.excludes_family("15", Some("Boissons")));
        assert!(!rules.excludes_family("BOIS", None));
    }

    #[test]
    fn reference_marker_is_case_insensitive() {
        assert!(is_reference_warehouse("kly gennevilliers"));
        assert!(is_reference_warehouse("Dépôt KLY Gennevilliers 2"));
        assert!(!is_reference_warehouse("KLY GROUPE"));
        assert_eq!(reference_warehouse_pattern(), "%KLY GENNEVILLIERS%");
    }
}
