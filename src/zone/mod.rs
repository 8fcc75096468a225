// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Implementation of the [`ZoneTree`], an in-memory index of the
//! records decoded from one ledger node.

use crate::message::{Qtype, Question};
use crate::name::{Label, Name};
use crate::rr::Record;

mod node;
use node::Node;

/// A tree of records keyed by owner name, built once per query from
/// the records of a zone.
///
/// Lookups are simpler than those of [RFC 1034 § 4.3.2]. The tree is
/// walked from the root one label at a time. When there is no child for
/// the next label, the lookup ends at the wildcard child `*` of the
/// current node, if there is one, regardless of how many labels are
/// left. An exact match is never replaced by a wildcard match, even if
/// the node found has no records.
///
/// [RFC 1034 § 4.3.2]: https://datatracker.ietf.org/doc/html/rfc1034#section-4.3.2
#[derive(Debug, Default)]
pub struct ZoneTree {
    root: Node,
}

impl ZoneTree {
    /// Builds a `ZoneTree` from `records`. Records with the same owner
    /// (compared case-insensitively) end up on the same node, in the
    /// order given.
    pub fn build(records: Vec<Record>) -> Self {
        let mut root = Node::default();
        for record in records {
            root.get_or_create_descendant(tree_labels(&record.owner))
                .records
                .push(record);
        }
        Self { root }
    }

    /// Returns the records found for `name` as described for
    /// [`ZoneTree`]. Owners are those of the stored records, so
    /// wildcard matches are not yet rewritten.
    pub fn find_subzone(&self, name: &Name) -> &[Record] {
        let mut node = &self.root;
        for label in tree_labels(name) {
            match node.child(&label) {
                Some(child) => node = child,
                None => {
                    return node
                        .wildcard_child()
                        .map_or(&[][..], |wildcard| &wildcard.records[..]);
                }
            }
        }
        &node.records
    }

    /// Answers `question`. Matching records are returned with their
    /// owner set to the QNAME. If none match, and neither CNAME nor
    /// `ANY` was asked for, a CNAME at the QNAME is returned instead.
    pub fn resolve(&self, question: &Question) -> Vec<Record> {
        let answers = self.lookup(&question.qname, question.qtype);
        if answers.is_empty() && question.qtype != Qtype::CNAME && question.qtype != Qtype::ANY {
            self.lookup(&question.qname, Qtype::CNAME)
        } else {
            answers
        }
    }

    fn lookup(&self, qname: &Name, qtype: Qtype) -> Vec<Record> {
        self.find_subzone(qname)
            .iter()
            .filter(|record| record.rr_type.matches(qtype))
            .map(|record| record.with_owner(qname))
            .collect()
    }
}

/// Returns the labels of `name` from the top of the tree down, leaving
/// out empty labels.
fn tree_labels(name: &Name) -> impl Iterator<Item = Label> {
    name.labels().rev().filter(|label| !label.is_null())
}
