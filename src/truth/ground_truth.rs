//! Ground-truth link derivation.
//!
//! # Task shapes
//!
//! | Shape | Grouping | Links per group |
//! |-------|----------|-----------------|
//! | [`GroundTruth::Identity`] | side 2 by identity | one per matching side-1 record |
//! | [`GroundTruth::SiblingSymmetric`] | family key | `g * (g - 1) / 2` |
//! | [`GroundTruth::SiblingAsymmetric`] | family key, per side | `g1 * g2` |
//! | [`GroundTruth::Rule`] | none (all pairs) | per [`TrueMatchRule`] |
//!
//! A family key is `trim(father) + "-" + trim(mother)`. A record missing either parent
//! identity has no family and is skipped, matching the `Unknown` verdict the sibling
//! [`TrueMatchRule`] gives such pairs.

use std::collections::{HashMap, HashSet};

use super::status::{LinkStatus, TrueMatchRule};
use crate::linker::{pair_key, Link};
use crate::record::{FieldId, Record, Role};

/// How true links are derived for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroundTruth {
    /// Same person on both sides: `field1` on side 1 equals `field2` on side 2.
    Identity {
        /// Identity field on side-1 records.
        field1: FieldId,
        /// Identity field on side-2 records.
        field2: FieldId,
    },
    /// Siblings within one record set.
    SiblingSymmetric {
        /// Father identity field.
        father: FieldId,
        /// Mother identity field.
        mother: FieldId,
    },
    /// Siblings across two record sets with their own parent fields.
    SiblingAsymmetric {
        /// Father identity field on side 1.
        father1: FieldId,
        /// Mother identity field on side 1.
        mother1: FieldId,
        /// Father identity field on side 2.
        father2: FieldId,
        /// Mother identity field on side 2.
        mother2: FieldId,
    },
    /// Every side-1/side-2 pair tested against a rule. Quadratic.
    Rule {
        /// Rule classifying each pair.
        rule: TrueMatchRule,
        /// Whether both sides are the same record set.
        symmetric: bool,
    },
}

impl GroundTruth {
    /// Sibling ground truth for two roles, symmetric when the roles are equal.
    pub fn siblings_for(role1: &Role, role2: &Role) -> Option<Self> {
        let (father1, mother1) = role1.parent_identity_fields()?;
        if role1 == role2 {
            return Some(GroundTruth::SiblingSymmetric {
                father: father1,
                mother: mother1,
            });
        }
        let (father2, mother2) = role2.parent_identity_fields()?;
        Some(GroundTruth::SiblingAsymmetric {
            father1,
            mother1,
            father2,
            mother2,
        })
    }

    /// Identity ground truth for two roles.
    pub fn identity_for(role1: &Role, role2: &Role) -> Option<Self> {
        Some(GroundTruth::Identity {
            field1: role1.identity_field()?,
            field2: role2.identity_field()?,
        })
    }

    /// Number of true links between the two sides.
    ///
    /// Symmetric shapes read `records1` only.
    pub fn count(&self, records1: &[&Record], records2: &[&Record]) -> usize {
        match self {
            GroundTruth::Identity { field1, field2 } => {
                let mut keys = HashSet::new();
                identity_pairs(records1, *field1, records2, *field2, |a, b| {
                    keys.insert(pair_key(a, b));
                });
                keys.len()
            }
            GroundTruth::SiblingSymmetric { father, mother } => families(records1, *father, *mother)
                .groups
                .iter()
                .map(|g| triangular(g.len()))
                .sum(),
            GroundTruth::SiblingAsymmetric {
                father1,
                mother1,
                father2,
                mother2,
            } => {
                let side1 = families(records1, *father1, *mother1);
                let side2 = families(records2, *father2, *mother2);
                side1
                    .iter()
                    .filter_map(|(key, g1)| side2.get(key).map(|g2| g1.len() * g2.len()))
                    .sum()
            }
            GroundTruth::Rule { rule, symmetric } => {
                let mut count = 0;
                rule_pairs(rule, *symmetric, records1, records2, |_, _| count += 1);
                count
            }
        }
    }

    /// Materialise the true links, one per unordered pair.
    pub fn links<'a>(
        &self,
        records1: &[&'a Record],
        role1: &Role,
        records2: &[&'a Record],
        role2: &Role,
    ) -> Vec<Link<'a>> {
        let link = |a: &'a Record, b: &'a Record| Link::ground_truth(a, role1.clone(), b, role2.clone());
        let mut out = Vec::new();

        match self {
            GroundTruth::Identity { field1, field2 } => {
                let mut seen = HashSet::new();
                identity_pairs(records1, *field1, records2, *field2, |a, b| {
                    if seen.insert(pair_key(a, b)) {
                        out.push(link(a, b));
                    }
                });
            }
            GroundTruth::SiblingSymmetric { father, mother } => {
                for group in &families(records1, *father, *mother).groups {
                    for (i, &a) in group.iter().enumerate() {
                        for &b in &group[i + 1..] {
                            out.push(link(a, b));
                        }
                    }
                }
            }
            GroundTruth::SiblingAsymmetric {
                father1,
                mother1,
                father2,
                mother2,
            } => {
                let side2 = families(records2, *father2, *mother2);
                for (key, g1) in families(records1, *father1, *mother1).iter() {
                    let Some(g2) = side2.get(key) else { continue };
                    for &a in g1 {
                        for &b in g2 {
                            out.push(link(a, b));
                        }
                    }
                }
            }
            GroundTruth::Rule { rule, symmetric } => {
                rule_pairs(rule, *symmetric, records1, records2, |a, b| out.push(link(a, b)));
            }
        }
        out
    }
}

/// `n * (n - 1) / 2`, the number of unordered pairs among `n` items.
pub fn triangular(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Family grouping key, or `None` unless both parents are identified.
pub fn family_key(record: &Record, father: FieldId, mother: FieldId) -> Option<String> {
    let f = record.field(father).trim();
    let m = record.field(mother).trim();
    if f.is_empty() || m.is_empty() {
        None
    } else {
        Some(format!("{f}-{m}"))
    }
}

/// Records grouped by family key, groups in first-seen order.
struct Families<'a> {
    keys: Vec<String>,
    groups: Vec<Vec<&'a Record>>,
    position: HashMap<String, usize>,
}

impl<'a> Families<'a> {
    fn get(&self, key: &str) -> Option<&[&'a Record]> {
        self.position.get(key).map(|&i| self.groups[i].as_slice())
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &[&'a Record])> + '_ {
        self.keys
            .iter()
            .map(String::as_str)
            .zip(self.groups.iter().map(Vec::as_slice))
    }
}

fn families<'a>(records: &[&'a Record], father: FieldId, mother: FieldId) -> Families<'a> {
    let mut out = Families {
        keys: Vec::new(),
        groups: Vec::new(),
        position: HashMap::new(),
    };
    for &record in records {
        let Some(key) = family_key(record, father, mother) else {
            continue;
        };
        match out.position.get(&key) {
            Some(&i) => out.groups[i].push(record),
            None => {
                out.position.insert(key.clone(), out.groups.len());
                out.keys.push(key);
                out.groups.push(vec![record]);
            }
        }
    }
    out
}

fn identity_pairs<'a>(
    records1: &[&'a Record],
    field1: FieldId,
    records2: &[&'a Record],
    field2: FieldId,
    mut emit: impl FnMut(&'a Record, &'a Record),
) {
    let mut by_identity: HashMap<&str, Vec<&'a Record>> = HashMap::new();
    for &r2 in records2 {
        let id = r2.field(field2).trim();
        if !id.is_empty() {
            by_identity.entry(id).or_default().push(r2);
        }
    }
    for &r1 in records1 {
        let id = r1.field(field1).trim();
        if id.is_empty() {
            continue;
        }
        for &r2 in by_identity.get(id).into_iter().flatten() {
            if !same_record(r1, r2) {
                emit(r1, r2);
            }
        }
    }
}

fn rule_pairs<'a>(
    rule: &TrueMatchRule,
    symmetric: bool,
    records1: &[&'a Record],
    records2: &[&'a Record],
    mut emit: impl FnMut(&'a Record, &'a Record),
) {
    if symmetric {
        for (i, &a) in records1.iter().enumerate() {
            for &b in &records1[i + 1..] {
                if !same_record(a, b) && rule.status(a, b) == LinkStatus::TrueMatch {
                    emit(a, b);
                }
            }
        }
    } else {
        for &a in records1 {
            for &b in records2 {
                if !same_record(a, b) && rule.status(a, b) == LinkStatus::TrueMatch {
                    emit(a, b);
                }
            }
        }
    }
}

fn same_record(a: &Record, b: &Record) -> bool {
    a.id() == b.id() && a.kind() == b.kind()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{birth, death, marriage, RecordId, RecordKind};
    use proptest::prelude::*;

    fn baby(id: u64, father: &str, mother: &str) -> Record {
        Record::new(RecordId(id), RecordKind::Birth)
            .with_field(birth::ORIGINAL_ID, format!("b{id}"))
            .with_field(birth::CHILD_IDENTITY, format!("p{id}"))
            .with_field(birth::FATHER_IDENTITY, father)
            .with_field(birth::MOTHER_IDENTITY, mother)
    }

    fn groom(id: u64, father: &str, mother: &str) -> Record {
        Record::new(RecordId(id), RecordKind::Marriage)
            .with_field(marriage::ORIGINAL_ID, format!("m{id}"))
            .with_field(marriage::GROOM_FATHER_IDENTITY, father)
            .with_field(marriage::GROOM_MOTHER_IDENTITY, mother)
    }

    fn refs(records: &[Record]) -> Vec<&Record> {
        records.iter().collect()
    }

    #[test]
    fn test_sibling_symmetric_three_siblings() {
        let records = vec![baby(1, "F1", "M1"), baby(2, "F1", "M1"), baby(3, "F1", "M1")];
        let r = refs(&records);
        let gt = GroundTruth::siblings_for(&Role::baby(), &Role::baby()).unwrap();
        assert_eq!(gt.count(&r, &r), 3);

        let links = gt.links(&r, &Role::baby(), &r, &Role::baby());
        let keys: HashSet<String> = links.iter().map(Link::pair_key).collect();
        assert_eq!(links.len(), 3);
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_family_key_rules() {
        let gt = GroundTruth::SiblingSymmetric {
            father: birth::FATHER_IDENTITY,
            mother: birth::MOTHER_IDENTITY,
        };
        let records = vec![
            baby(1, "", ""),
            baby(2, " ", ""),
            baby(3, "F1", ""),
            baby(4, "F1 ", ""),
            baby(5, "", "M1"),
            baby(6, " F2", "M2 "),
        ];
        let r = refs(&records);
        assert_eq!(gt.count(&r, &r), 0);
        assert_eq!(family_key(&records[0], birth::FATHER_IDENTITY, birth::MOTHER_IDENTITY), None);
        assert_eq!(family_key(&records[3], birth::FATHER_IDENTITY, birth::MOTHER_IDENTITY), None);
        assert_eq!(family_key(&records[4], birth::FATHER_IDENTITY, birth::MOTHER_IDENTITY), None);
        assert_eq!(
            family_key(&records[5], birth::FATHER_IDENTITY, birth::MOTHER_IDENTITY).as_deref(),
            Some("F2-M2")
        );
    }

    #[test]
    fn test_sibling_asymmetric_cross_product() {
        let babies = vec![baby(1, "F1", "M1"), baby(2, "F1", "M1"), baby(3, "F2", "M2")];
        let grooms = vec![groom(10, "F1", "M1"), groom(11, "F1", "M1"), groom(12, "F1", "M1")];
        let gt = GroundTruth::siblings_for(&Role::baby(), &Role::groom()).unwrap();
        assert!(matches!(gt, GroundTruth::SiblingAsymmetric { .. }));
        assert_eq!(gt.count(&refs(&babies), &refs(&grooms)), 6);
        assert_eq!(
            gt.links(&refs(&babies), &Role::baby(), &refs(&grooms), &Role::groom())
                .len(),
            6
        );
    }

    #[test]
    fn test_identity_ground_truth() {
        let births = vec![baby(1, "", ""), baby(2, "", ""), baby(3, "", "")];
        let deaths = vec![
            Record::new(RecordId(20), RecordKind::Death)
                .with_field(death::ORIGINAL_ID, "d20")
                .with_field(death::DECEASED_IDENTITY, "p1"),
            Record::new(RecordId(21), RecordKind::Death)
                .with_field(death::ORIGINAL_ID, "d21")
                .with_field(death::DECEASED_IDENTITY, "p3"),
            Record::new(RecordId(22), RecordKind::Death),
        ];
        let gt = GroundTruth::identity_for(&Role::baby(), &Role::deceased()).unwrap();
        assert_eq!(gt.count(&refs(&births), &refs(&deaths)), 2);

        let links = gt.links(&refs(&births), &Role::baby(), &refs(&deaths), &Role::deceased());
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|l| l.provenance() == "ground truth"));
        assert_eq!(links[0].record2().id(), RecordId(20));
    }

    #[test]
    fn test_identity_ground_truth_without_original_ids() {
        let born = |id: u64, person: &str| {
            Record::new(RecordId(id), RecordKind::Birth).with_field(birth::CHILD_IDENTITY, person)
        };
        let died = |id: u64, person: &str| {
            Record::new(RecordId(id), RecordKind::Death).with_field(death::DECEASED_IDENTITY, person)
        };
        let births = vec![born(1, "p1"), born(2, "p2")];
        let deaths = vec![died(2, "p1"), died(1, "p2")];
        let gt = GroundTruth::identity_for(&Role::baby(), &Role::deceased()).unwrap();
        assert_eq!(gt.count(&refs(&births), &refs(&deaths)), 2);
        assert_eq!(
            gt.links(&refs(&births), &Role::baby(), &refs(&deaths), &Role::deceased())
                .len(),
            2
        );
    }

    #[test]
    fn test_rule_ground_truth_matches_grouping() {
        let records = vec![
            baby(1, "F1", "M1"),
            baby(2, "F1", "M1"),
            baby(3, "F2", "M2"),
            baby(4, "F2", "M2"),
            baby(5, "F2", "M2"),
        ];
        let r = refs(&records);
        let rule = TrueMatchRule::siblings_for(&Role::baby(), &Role::baby()).unwrap();
        let gt = GroundTruth::Rule {
            rule,
            symmetric: true,
        };
        assert_eq!(gt.count(&r, &r), 4);
    }

    proptest! {
        #[test]
        fn prop_triangular_number_law(sizes in proptest::collection::vec(1usize..8, 1..6)) {
            let mut records = Vec::new();
            let mut id = 0;
            for (family, &size) in sizes.iter().enumerate() {
                for _ in 0..size {
                    records.push(baby(id, &format!("F{family}"), &format!("M{family}")));
                    id += 1;
                }
            }
            let r = refs(&records);
            let gt = GroundTruth::SiblingSymmetric {
                father: birth::FATHER_IDENTITY,
                mother: birth::MOTHER_IDENTITY,
            };
            let expected: usize = sizes.iter().map(|&g| g * (g - 1) / 2).sum();
            prop_assert_eq!(gt.count(&r, &r), expected);
            prop_assert_eq!(gt.links(&r, &Role::baby(), &r, &Role::baby()).len(), expected);
        }

        #[test]
        fn prop_cross_product_law(m in 0usize..6, n in 0usize..6, others in 0usize..4) {
            let mut babies: Vec<Record> = (0..m as u64).map(|i| baby(i, "F", "M")).collect();
            babies.extend((0..others as u64).map(|i| baby(100 + i, "X", "Y")));
            let grooms: Vec<Record> = (0..n as u64).map(|i| groom(i, "F", "M")).collect();
            let gt = GroundTruth::SiblingAsymmetric {
                father1: birth::FATHER_IDENTITY,
                mother1: birth::MOTHER_IDENTITY,
                father2: marriage::GROOM_FATHER_IDENTITY,
                mother2: marriage::GROOM_MOTHER_IDENTITY,
            };
            prop_assert_eq!(gt.count(&refs(&babies), &refs(&grooms)), m * n);
        }
    }
}
