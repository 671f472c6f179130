use crate::schema::{
    CardDefinition, Catalog, GameConfig, PackDefinition, Tier, CONFIG_FILE, PACKS_FILE,
    PLAYERS_FILE,
};
use anyhow::{bail, Context};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

const BUILTIN_PLAYERS: &str = include_str!("../../../assets/players.json");
const BUILTIN_PACKS: &str = include_str!("../../../assets/packs.json");
const BUILTIN_CONFIG: &str = include_str!("../../../assets/economy.json");

pub fn load_catalog(dir: &Path) -> anyhow::Result<Catalog> {
    let cards: Vec<CardDefinition> = load_json(dir.join(PLAYERS_FILE))?;
    let packs: Vec<PackDefinition> = load_json(dir.join(PACKS_FILE))?;
    let catalog = Catalog::new(cards, packs);
    validate_catalog(&catalog).with_context(|| format!("validate catalog in {}", dir.display()))?;
    Ok(catalog)
}

/// Falls back to the built-in rules when the directory has no config file.
pub fn load_game_config(dir: &Path) -> anyhow::Result<GameConfig> {
    let path = dir.join(CONFIG_FILE);
    if path.exists() {
        load_json(path)
    } else {
        Ok(GameConfig::default())
    }
}

/// Catalog compiled into the binary from the `assets` directory.
pub fn builtin_catalog() -> anyhow::Result<Catalog> {
    let cards: Vec<CardDefinition> =
        serde_json::from_str(BUILTIN_PLAYERS).context("parse built-in players")?;
    let packs: Vec<PackDefinition> =
        serde_json::from_str(BUILTIN_PACKS).context("parse built-in packs")?;
    let catalog = Catalog::new(cards, packs);
    validate_catalog(&catalog).context("validate built-in catalog")?;
    Ok(catalog)
}

pub fn builtin_game_config() -> anyhow::Result<GameConfig> {
    serde_json::from_str(BUILTIN_CONFIG).context("parse built-in config")
}

pub fn validate_catalog(catalog: &Catalog) -> anyhow::Result<()> {
    let mut card_ids = HashSet::new();
    for card in &catalog.cards {
        if card.id.trim().is_empty() {
            bail!("card '{}' has an empty id", card.name);
        }
        if !card_ids.insert(card.id.as_str()) {
            bail!("duplicate card id '{}'", card.id);
        }
    }

    let mut pack_ids = HashSet::new();
    for pack in &catalog.packs {
        if !pack_ids.insert(pack.id.as_str()) {
            bail!("duplicate pack id '{}'", pack.id);
        }
        validate_pack(pack)?;
    }

    if let Some((pack, tier)) = catalog.empty_reachable_tiers().into_iter().next() {
        bail!("pack '{pack}' can draw {tier} but the catalog has no {tier} cards");
    }
    Ok(())
}

fn validate_pack(pack: &PackDefinition) -> anyhow::Result<()> {
    if pack.price == 0 {
        bail!("pack '{}' must cost something", pack.id);
    }
    if pack.cards_count == 0 {
        bail!("pack '{}' must contain at least one card", pack.id);
    }
    if let Some(entry) = pack
        .odds
        .iter()
        .find(|entry| !entry.weight.is_finite() || entry.weight < 0.0)
    {
        bail!(
            "pack '{}' has invalid weight {} for {}",
            pack.id,
            entry.weight,
            entry.tier
        );
    }
    let total: f64 = pack.odds.iter().map(|entry| entry.weight).sum();
    if total <= 0.0 {
        bail!("pack '{}' has no positive odds", pack.id);
    }
    let mut seen: HashSet<Tier> = HashSet::new();
    for entry in &pack.odds {
        if !seen.insert(entry.tier) {
            bail!("pack '{}' lists {} twice", pack.id, entry.tier);
        }
    }
    if let Some(rule) = pack.guarantee_rule() {
        if rule.forced < rule.at_least {
            bail!(
                "pack '{}' forces {} which does not satisfy its {} guarantee",
                pack.id,
                rule.forced,
                rule.at_least
            );
        }
    }
    Ok(())
}

fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value = serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(value)
}
