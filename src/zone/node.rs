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

//! Implementation of the [`Node`] structure for the zone tree.

use std::collections::HashMap;

use crate::name::Label;
use crate::rr::Record;

/// A node in the zone tree. Children are keyed by their label, made
/// lowercase.
#[derive(Debug, Default)]
pub(super) struct Node {
    pub records: Vec<Record>,
    pub children: HashMap<Box<[u8]>, Node>,
}

impl Node {
    /// Gets or creates the descendant reached by following `labels`
    /// down from `self`. Any nodes in between are created as well.
    pub fn get_or_create_descendant<'a, I>(&mut self, mut labels: I) -> &mut Self
    where
        I: Iterator<Item = Label<'a>>,
    {
        match labels.next() {
            None => self,
            Some(label) => self
                .children
                .entry(label.to_ascii_lowercase().as_slice().into())
                .or_default()
                .get_or_create_descendant(labels),
        }
    }

    /// Returns the child for `label`, if there is one.
    pub fn child(&self, label: &Label) -> Option<&Self> {
        self.children.get(label.to_ascii_lowercase().as_slice())
    }

    /// Returns the wildcard child `*`, if there is one.
    pub fn wildcard_child(&self) -> Option<&Self> {
        self.children.get(&b"*"[..])
    }
}
