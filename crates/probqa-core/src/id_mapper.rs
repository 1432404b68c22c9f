//! Permanent ↔ compact id mapping.
//!
//! Compact ids are dense internal indices that change on compaction.
//! Permanent ids are handed out monotonically and never change for the
//! lifetime of the entity. A removed entity leaves a gap in the compact
//! space until the next compaction.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{TPqaId, INVALID_PQA_ID};

/// Bidirectional mapping between compact and permanent ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MapperRepr", into = "MapperRepr")]
pub struct IdMapper {
    comp_to_perm: Vec<TPqaId>,
    perm_to_comp: HashMap<TPqaId, TPqaId>,
    next_perm: TPqaId,
}

/// On-disk form: the reverse index is rebuilt on load.
#[derive(Clone, Serialize, Deserialize)]
struct MapperRepr {
    comp_to_perm: Vec<TPqaId>,
    next_perm: TPqaId,
}

impl TryFrom<MapperRepr> for IdMapper {
    type Error = String;

    /// Live permanent ids must be unique, non-negative and below
    /// `next_perm`; `-1` marks a gap.
    fn try_from(repr: MapperRepr) -> Result<Self, Self::Error> {
        if repr.next_perm < 0 {
            return Err(format!("negative next permanent id {}", repr.next_perm));
        }
        let mut perm_to_comp = HashMap::with_capacity(repr.comp_to_perm.len());
        for (comp, &perm) in repr.comp_to_perm.iter().enumerate() {
            if perm == INVALID_PQA_ID {
                continue;
            }
            if perm < 0 {
                return Err(format!("compact id {comp} has negative permanent id {perm}"));
            }
            if perm >= repr.next_perm {
                return Err(format!(
                    "permanent id {perm} is not below next permanent id {}",
                    repr.next_perm
                ));
            }
            if let Some(first) = perm_to_comp.insert(perm, comp as TPqaId) {
                return Err(format!(
                    "permanent id {perm} is used by compact ids {first} and {comp}"
                ));
            }
        }
        Ok(Self {
            comp_to_perm: repr.comp_to_perm,
            perm_to_comp,
            next_perm: repr.next_perm,
        })
    }
}

impl From<IdMapper> for MapperRepr {
    fn from(mapper: IdMapper) -> Self {
        Self {
            comp_to_perm: mapper.comp_to_perm,
            next_perm: mapper.next_perm,
        }
    }
}

impl IdMapper {
    /// Identity mapping for `n` entities: compact `i` ↔ permanent `i`.
    pub fn with_len(n: TPqaId) -> Self {
        let n = n.max(0);
        Self {
            comp_to_perm: (0..n).collect(),
            perm_to_comp: (0..n).map(|i| (i, i)).collect(),
            next_perm: n,
        }
    }

    /// Size of the compact id space, gaps included.
    pub fn len(&self) -> TPqaId {
        self.comp_to_perm.len() as TPqaId
    }

    pub fn is_empty(&self) -> bool {
        self.comp_to_perm.is_empty()
    }

    /// Number of entities that have not been removed.
    pub fn live_count(&self) -> usize {
        self.perm_to_comp.len()
    }

    /// Whether `comp` references an entity that has not been removed.
    pub fn is_live(&self, comp: TPqaId) -> bool {
        self.perm_of(comp).is_some()
    }

    pub fn perm_of(&self, comp: TPqaId) -> Option<TPqaId> {
        let idx = usize::try_from(comp).ok()?;
        match self.comp_to_perm.get(idx) {
            Some(&perm) if perm != INVALID_PQA_ID => Some(perm),
            _ => None,
        }
    }

    pub fn comp_of(&self, perm: TPqaId) -> Option<TPqaId> {
        self.perm_to_comp.get(&perm).copied()
    }

    /// Compact ids of all live entities, ascending.
    pub fn live_comps(&self) -> impl Iterator<Item = TPqaId> + '_ {
        self.comp_to_perm
            .iter()
            .enumerate()
            .filter(|(_, &perm)| perm != INVALID_PQA_ID)
            .map(|(comp, _)| comp as TPqaId)
    }

    /// Translate compact ids to permanent ids in place.
    ///
    /// Returns `false` without touching `ids` if any id is not live or
    /// appears more than once.
    pub fn perm_from_comp(&self, ids: &mut [TPqaId]) -> bool {
        translate_all(ids, |comp| self.perm_of(comp))
    }

    /// Translate permanent ids to compact ids in place.
    ///
    /// Returns `false` without touching `ids` if any id is unknown or
    /// appears more than once.
    pub fn comp_from_perm(&self, ids: &mut [TPqaId]) -> bool {
        translate_all(ids, |perm| self.comp_of(perm))
    }

    /// Append a new entity at the end of the compact space.
    pub fn push_new(&mut self) -> TPqaId {
        let comp = self.len();
        let perm = self.take_next_perm();
        self.comp_to_perm.push(perm);
        self.perm_to_comp.insert(perm, comp);
        comp
    }

    /// Place a new entity in the first gap, or append if there is none.
    pub fn allocate_reusing_gap(&mut self) -> TPqaId {
        let gap = self
            .comp_to_perm
            .iter()
            .position(|&perm| perm == INVALID_PQA_ID);
        match gap {
            Some(idx) => {
                let perm = self.take_next_perm();
                self.comp_to_perm[idx] = perm;
                self.perm_to_comp.insert(perm, idx as TPqaId);
                idx as TPqaId
            }
            None => self.push_new(),
        }
    }

    /// Turn a live compact id into a gap. Returns `false` if it was not live.
    pub fn remove(&mut self, comp: TPqaId) -> bool {
        let Some(perm) = self.perm_of(comp) else {
            return false;
        };
        self.comp_to_perm[comp as usize] = INVALID_PQA_ID;
        self.perm_to_comp.remove(&perm);
        true
    }

    /// Drop all gaps and renumber compact ids densely.
    ///
    /// Returns, for each new compact id, the old compact id it came from.
    pub fn compact(&mut self) -> Vec<TPqaId> {
        let old_comps: Vec<TPqaId> = self.live_comps().collect();
        self.comp_to_perm = old_comps
            .iter()
            .map(|&old| self.comp_to_perm[old as usize])
            .collect();
        self.perm_to_comp = self
            .comp_to_perm
            .iter()
            .enumerate()
            .map(|(comp, &perm)| (perm, comp as TPqaId))
            .collect();
        old_comps
    }

    /// Ensure the next permanent id is greater than `bound`.
    ///
    /// Returns whether the next permanent id had to be raised.
    pub fn ensure_perm_greater(&mut self, bound: TPqaId) -> bool {
        if self.next_perm > bound {
            return false;
        }
        self.next_perm = bound.saturating_add(1);
        true
    }

    /// Move a live entity from permanent id `src` to the unused id `dest`.
    pub fn remap_perm(&mut self, src: TPqaId, dest: TPqaId) -> bool {
        if dest < 0 || self.perm_to_comp.contains_key(&dest) {
            return false;
        }
        let Some(comp) = self.perm_to_comp.remove(&src) else {
            return false;
        };
        self.comp_to_perm[comp as usize] = dest;
        self.perm_to_comp.insert(dest, comp);
        if dest >= self.next_perm {
            self.next_perm = dest.saturating_add(1);
        }
        true
    }

    fn take_next_perm(&mut self) -> TPqaId {
        let perm = self.next_perm;
        self.next_perm += 1;
        perm
    }
}

fn translate_all(ids: &mut [TPqaId], map: impl Fn(TPqaId) -> Option<TPqaId>) -> bool {
    let mut seen = HashSet::with_capacity(ids.len());
    if !ids.iter().all(|&id| seen.insert(id)) {
        return false;
    }
    let Some(translated) = ids.iter().map(|&id| map(id)).collect::<Option<Vec<_>>>() else {
        return false;
    };
    ids.copy_from_slice(&translated);
    true
}
