use std::collections::HashMap;

use crate::definitions::*;

/// Builder for constructing an immutable [`GameDefinitions`] bundle.
///
/// Records are registered in any order; [`build`](Self::build) sorts wave
/// spawns, checks for duplicate ids, and resolves cross-table references.
#[derive(Debug, Default)]
pub struct DefinitionsBuilder {
    towers: Vec<TowerDef>,
    enemies: Vec<EnemyDef>,
    maps: Vec<MapDef>,
    waves: Vec<WaveDef>,
    relics: Vec<RelicDef>,
}

impl DefinitionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_tower(&mut self, tower: TowerDef) -> &mut Self {
        self.towers.push(tower);
        self
    }

    pub fn register_enemy(&mut self, enemy: EnemyDef) -> &mut Self {
        self.enemies.push(enemy);
        self
    }

    pub fn register_map(&mut self, map: MapDef) -> &mut Self {
        self.maps.push(map);
        self
    }

    pub fn register_wave(&mut self, wave: WaveDef) -> &mut Self {
        self.waves.push(wave);
        self
    }

    pub fn register_relic(&mut self, relic: RelicDef) -> &mut Self {
        self.relics.push(relic);
        self
    }

    /// Finalize into the immutable bundle.
    pub fn build(mut self) -> Result<GameDefinitions, RegistryError> {
        let tower_index = index_by_id("tower", self.towers.iter().map(|t| t.id.as_str()))?;
        let enemy_index = index_by_id("enemy", self.enemies.iter().map(|e| e.id.as_str()))?;
        let map_index = index_by_id("map", self.maps.iter().map(|m| m.id.as_str()))?;
        let relic_index = index_by_id("relic", self.relics.iter().map(|r| r.id.as_str()))?;

        for map in &self.maps {
            if map.waypoints.is_empty() {
                return Err(RegistryError::EmptyPath(map.id.clone()));
            }
            let ordered = map
                .waypoints
                .windows(2)
                .all(|pair| pair[0].path_progress <= pair[1].path_progress);
            if !ordered {
                return Err(RegistryError::UnorderedPath(map.id.clone()));
            }
        }

        self.waves.sort_by_key(|w| w.index);
        // The scheduler addresses waves by position, so indices must be 0..n.
        for (position, wave) in self.waves.iter().enumerate() {
            if wave.index as usize != position {
                return Err(RegistryError::WaveIndexMismatch {
                    expected: position as u32,
                    found: wave.index,
                });
            }
        }
        for wave in &mut self.waves {
            wave.spawns.sort_by_key(|s| s.spawn_tick);
            for spawn in &wave.spawns {
                if !enemy_index.contains_key(&spawn.enemy_type) {
                    return Err(RegistryError::UnknownEnemyRef {
                        wave: wave.index,
                        enemy: spawn.enemy_type.clone(),
                    });
                }
            }
        }

        Ok(GameDefinitions {
            towers: self.towers,
            tower_index,
            enemies: self.enemies,
            enemy_index,
            maps: self.maps,
            map_index,
            waves: self.waves,
            relics: self.relics,
            relic_index,
        })
    }
}

fn index_by_id<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<HashMap<String, usize>, RegistryError> {
    let mut index = HashMap::new();
    for (i, id) in ids.enumerate() {
        if index.insert(id.to_string(), i).is_some() {
            return Err(RegistryError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(index)
}

/// Immutable definitions bundle. Frozen after build(). Share it behind an `Arc`.
#[derive(Debug)]
pub struct GameDefinitions {
    towers: Vec<TowerDef>,
    tower_index: HashMap<String, usize>,
    enemies: Vec<EnemyDef>,
    enemy_index: HashMap<String, usize>,
    maps: Vec<MapDef>,
    map_index: HashMap<String, usize>,
    waves: Vec<WaveDef>,
    relics: Vec<RelicDef>,
    relic_index: HashMap<String, usize>,
}

impl GameDefinitions {
    pub fn tower(&self, id: &str) -> Option<&TowerDef> {
        self.tower_index.get(id).map(|&i| &self.towers[i])
    }

    pub fn enemy(&self, id: &str) -> Option<&EnemyDef> {
        self.enemy_index.get(id).map(|&i| &self.enemies[i])
    }

    pub fn map(&self, id: &str) -> Option<&MapDef> {
        self.map_index.get(id).map(|&i| &self.maps[i])
    }

    pub fn relic(&self, id: &str) -> Option<&RelicDef> {
        self.relic_index.get(id).map(|&i| &self.relics[i])
    }

    pub fn wave(&self, index: usize) -> Option<&WaveDef> {
        self.waves.get(index)
    }

    pub fn towers(&self) -> &[TowerDef] {
        &self.towers
    }

    pub fn enemies(&self) -> &[EnemyDef] {
        &self.enemies
    }

    pub fn maps(&self) -> &[MapDef] {
        &self.maps
    }

    /// Waves in index order.
    pub fn waves(&self) -> &[WaveDef] {
        &self.waves
    }

    /// Relics in registration order. Offer generation relies on this order.
    pub fn relics(&self) -> &[RelicDef] {
        &self.relics
    }

    pub fn wave_count(&self) -> usize {
        self.waves.len()
    }

    /// Number of spawn entries in a wave, or zero if the index is unknown.
    pub fn wave_enemy_count(&self, index: usize) -> usize {
        self.waves.get(index).map(|w| w.spawns.len()).unwrap_or(0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },
    #[error("wave {wave} references unknown enemy: {enemy}")]
    UnknownEnemyRef { wave: u32, enemy: String },
    #[error("map {0} has no waypoints")]
    EmptyPath(String),
    #[error("map {0} has waypoints out of path-progress order")]
    UnorderedPath(String),
    #[error("wave index {found} where {expected} was expected")]
    WaveIndexMismatch { expected: u32, found: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn setup_builder() -> DefinitionsBuilder {
        let mut b = DefinitionsBuilder::new();
        b.register_enemy(make_enemy("grunt", 10.0, 1.0, 5))
            .register_tower(make_tower("gun", 50, 3.0, 1.0, 10.0))
            .register_map(line_map())
            .register_relic(make_relic("amp", EffectKind::TowerDamageMultiplier, 2.0));
        b
    }

    #[test]
    fn register_and_build() {
        let defs = setup_builder().build().unwrap();
        assert!(defs.tower("gun").is_some());
        assert!(defs.enemy("grunt").is_some());
        assert!(defs.map("line").is_some());
        assert!(defs.relic("amp").is_some());
        assert!(defs.tower("nonexistent").is_none());
    }

    #[test]
    fn spawns_sorted_stably_by_tick() {
        let mut b = setup_builder();
        b.register_enemy(make_enemy("brute", 40.0, 0.5, 10));
        b.register_wave(WaveDef {
            index: 0,
            coin_reward: 10,
            is_boss_wave: false,
            spawns: vec![
                spawn("grunt", 40),
                spawn("brute", 20),
                spawn("grunt", 20),
                spawn("brute", 0),
            ],
        });
        let defs = b.build().unwrap();
        let order: Vec<(&str, u64)> = defs.waves()[0]
            .spawns
            .iter()
            .map(|s| (s.enemy_type.as_str(), s.spawn_tick))
            .collect();
        assert_eq!(
            order,
            vec![("brute", 0), ("brute", 20), ("grunt", 20), ("grunt", 40)]
        );
    }

    #[test]
    fn waves_ordered_by_index() {
        let mut b = setup_builder();
        b.register_wave(wave(1, 20, &[("grunt", 0)]));
        b.register_wave(wave(0, 10, &[("grunt", 0)]));
        let defs = b.build().unwrap();
        assert_eq!(defs.waves()[0].index, 0);
        assert_eq!(defs.waves()[1].index, 1);
    }

    #[test]
    fn wave_index_gaps_and_duplicates_fail() {
        let mut gapped = setup_builder();
        gapped.register_wave(wave(0, 10, &[("grunt", 0)]));
        gapped.register_wave(wave(2, 10, &[("grunt", 0)]));
        assert!(matches!(
            gapped.build(),
            Err(RegistryError::WaveIndexMismatch { expected: 1, found: 2 })
        ));

        let mut doubled = setup_builder();
        doubled.register_wave(wave(0, 10, &[("grunt", 0)]));
        doubled.register_wave(wave(0, 20, &[("grunt", 5)]));
        assert!(matches!(
            doubled.build(),
            Err(RegistryError::WaveIndexMismatch { expected: 1, found: 0 })
        ));

        let mut late_start = setup_builder();
        late_start.register_wave(wave(1, 10, &[("grunt", 0)]));
        assert!(matches!(
            late_start.build(),
            Err(RegistryError::WaveIndexMismatch { expected: 0, found: 1 })
        ));
    }

    #[test]
    fn unknown_enemy_ref_fails() {
        let mut b = setup_builder();
        b.register_wave(wave(0, 10, &[("ghost", 0)]));
        match b.build() {
            Err(RegistryError::UnknownEnemyRef { wave: 0, enemy }) => assert_eq!(enemy, "ghost"),
            other => panic!("expected UnknownEnemyRef, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_id_fails() {
        let mut b = setup_builder();
        b.register_tower(make_tower("gun", 10, 1.0, 1.0, 1.0));
        assert!(matches!(
            b.build(),
            Err(RegistryError::DuplicateId { kind: "tower", .. })
        ));
    }

    #[test]
    fn empty_path_fails() {
        let mut b = DefinitionsBuilder::new();
        let mut map = line_map();
        map.waypoints.clear();
        b.register_map(map);
        assert!(matches!(b.build(), Err(RegistryError::EmptyPath(_))));
    }

    #[test]
    fn canonical_content_builds() {
        let defs = canonical_definitions();
        assert_eq!(defs.wave_count(), 12);
        assert_eq!(defs.relics().len(), 8);
        assert_eq!(defs.wave_enemy_count(0), 3);
        // Wave 3 is authored out of tick order.
        let ticks: Vec<u64> = defs.waves()[3].spawns.iter().map(|s| s.spawn_tick).collect();
        assert_eq!(ticks, vec![0, 20, 30, 40]);
    }
}
