// THEORY:
// The spell catalog is presentation metadata only. The classifier works purely
// on labels; the catalog maps a label to what the display shows (name,
// incantation, a short description and a theme colour). Its order doubles as
// the classifier's tie-break priority, so the list is kept ordered rather than
// keyed.

use serde::{Deserialize, Serialize};

/// Display metadata for one spell. `key` is the classifier label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellInfo {
    pub key: String,
    pub name: String,
    pub incantation: String,
    pub description: String,
    /// Theme colour as `#RRGGBB`.
    pub color: String,
}

impl SpellInfo {
    fn new(key: &str, name: &str, incantation: &str, description: &str, color: &str) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            incantation: incantation.into(),
            description: description.into(),
            color: color.into(),
        }
    }

    /// Parses `color` into RGB, `None` if it is not `#RRGGBB`.
    pub fn rgb(&self) -> Option<[u8; 3]> {
        let hex = self.color.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        Some([channel(0)?, channel(2)?, channel(4)?])
    }
}

/// The eight spells of the standard set, in tie-break priority order.
pub fn standard_spells() -> Vec<SpellInfo> {
    vec![
        SpellInfo::new(
            "alohomora",
            "Alohomora",
            "Ah-LOH-ho-MOR-ah",
            "Unlocking charm. Draw a clockwise circle.",
            "#FFD700",
        ),
        SpellInfo::new(
            "lumos",
            "Lumos",
            "LOO-mos",
            "Wand-lighting charm. Flick the wand upward.",
            "#FFFFFF",
        ),
        SpellInfo::new(
            "nox",
            "Nox",
            "NOCKS",
            "Wand-extinguishing charm. Flick the wand downward.",
            "#4B0082",
        ),
        SpellInfo::new(
            "incendio",
            "Incendio",
            "in-SEN-dee-oh",
            "Fire-making spell. Wave diagonally.",
            "#FF4500",
        ),
        SpellInfo::new(
            "aguamenti",
            "Aguamenti",
            "AH-gwah-MEN-tee",
            "Water-making spell. Trace an S-curve.",
            "#1E90FF",
        ),
        SpellInfo::new(
            "wingardium_leviosa",
            "Wingardium Leviosa",
            "win-GAR-dee-um lev-ee-OH-sa",
            "Levitation charm. Swish and flick.",
            "#98FB98",
        ),
        SpellInfo::new(
            "arresto_momentum",
            "Arresto Momentum",
            "ah-REST-oh moh-MEN-tum",
            "Slowing charm. Sweep horizontally.",
            "#87CEEB",
        ),
        SpellInfo::new(
            "revelio",
            "Revelio",
            "reh-VEL-ee-oh",
            "Revealing charm. Draw a counter-clockwise circle.",
            "#DA70D6",
        ),
    ]
}

/// Looks up a spell by classifier label.
pub fn find<'a>(spells: &'a [SpellInfo], key: &str) -> Option<&'a SpellInfo> {
    spells.iter().find(|s| s.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_set_has_unique_keys_in_priority_order() {
        let spells = standard_spells();
        let keys: Vec<&str> = spells.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "alohomora",
                "lumos",
                "nox",
                "incendio",
                "aguamenti",
                "wingardium_leviosa",
                "arresto_momentum",
                "revelio"
            ]
        );
        assert_eq!(find(&spells, "nox").map(|s| s.name.as_str()), Some("Nox"));
        assert!(find(&spells, "avada_kedavra").is_none());
    }

    #[test]
    fn colors_parse_as_rgb() {
        let spells = standard_spells();
        assert!(spells.iter().all(|s| s.rgb().is_some()));
        assert_eq!(spells[0].rgb(), Some([0xFF, 0xD7, 0x00]));

        let mut broken = spells[0].clone();
        broken.color = "gold".into();
        assert_eq!(broken.rgb(), None);
    }
}
