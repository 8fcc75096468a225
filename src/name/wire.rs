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

//! Implementation of parsing and validation of on-the-wire names.

use arrayvec::ArrayVec;

use super::{Error, Name, MAX_LABEL_LEN, MAX_N_LABELS, MAX_WIRE_LEN};

////////////////////////////////////////////////////////////////////////
// UNCOMPRESSED ON-THE-WIRE NAMES                                     //
////////////////////////////////////////////////////////////////////////

/// Parses an uncompressed name present at the beginning of `octets`.
/// This is the implementation of [`Name::try_from_uncompressed`].
pub fn parse_uncompressed_name(octets: &[u8]) -> Result<(Name, usize), Error> {
    let mut label_offsets = ArrayVec::<u8, MAX_N_LABELS>::new();
    let wire_len = walk_uncompressed_name(octets, |offset| label_offsets.push(offset as u8))?;
    Ok((
        Name::from_parts(&octets[..wire_len], &label_offsets),
        wire_len,
    ))
}

/// Validates an uncompressed name present at the beginning of `octets`.
/// This is the implementation of [`Name::validate_uncompressed`].
pub fn validate_uncompressed_name(octets: &[u8]) -> Result<usize, Error> {
    walk_uncompressed_name(octets, |_| ())
}

/// Walks the labels of an uncompressed name, calling `on_label` with
/// the offset of each. Returns the length of the name.
fn walk_uncompressed_name(octets: &[u8], mut on_label: impl FnMut(usize)) -> Result<usize, Error> {
    let mut offset = 0;
    loop {
        let label_len = *octets.get(offset).ok_or(Error::UnexpectedEom)?;
        if label_len > (MAX_LABEL_LEN as u8) {
            return Err(Error::LabelTooLong);
        }
        on_label(offset);
        offset += label_len as usize + 1;

        // Checked on every label so that on_label is called at most
        // MAX_N_LABELS times.
        if offset > MAX_WIRE_LEN {
            return Err(Error::NameTooLong);
        } else if label_len == 0 {
            return Ok(offset);
        }
    }
}

////////////////////////////////////////////////////////////////////////
// COMPRESSED ON-THE-WIRE NAMES                                       //
////////////////////////////////////////////////////////////////////////

/// Parses a compressed name starting at index `start` of `octets`.
/// Pointers are followed. Indices given in pointers are treated as
/// indices of `octets`. This is the implementation of
/// [`Name::try_from_compressed`].
pub fn parse_compressed_name(octets: &[u8], start: usize) -> Result<(Name, usize), Error> {
    let mut next_chunk = Some(start);
    let mut wire_len_of_first_chunk = None;

    let mut label_offsets = ArrayVec::<u8, MAX_N_LABELS>::new();
    let mut wire_repr = ArrayVec::<u8, MAX_WIRE_LEN>::new();

    while let Some(chunk_start) = next_chunk {
        let mut index = chunk_start;
        loop {
            let len = *octets.get(index).ok_or(Error::UnexpectedEom)?;
            if len & 0xc0 == 0xc0 {
                next_chunk = Some(parse_pointer(octets, chunk_start, index)?);
                index += 2;
                break;
            } else if len > (MAX_LABEL_LEN as u8) {
                return Err(Error::LabelTooLong);
            }

            let end_of_label = index + len as usize + 1;
            if end_of_label > octets.len() {
                return Err(Error::UnexpectedEom);
            }
            label_offsets
                .try_push(wire_repr.len() as u8)
                .or(Err(Error::NameTooLong))?;
            wire_repr
                .try_extend_from_slice(&octets[index..end_of_label])
                .or(Err(Error::NameTooLong))?;
            index = end_of_label;
            if len == 0 {
                next_chunk = None;
                break;
            }
        }
        wire_len_of_first_chunk.get_or_insert(index - chunk_start);
    }

    let name = Name::from_parts(&wire_repr, &label_offsets);
    Ok((name, wire_len_of_first_chunk.unwrap_or_default()))
}

/// Parses a pointer at `index` in `octets`. This also checks that the
/// pointer refers to an index *earlier* than the start of the chunk it
/// is in (`chunk_start`), which rules out loops.
fn parse_pointer(octets: &[u8], chunk_start: usize, index: usize) -> Result<usize, Error> {
    match octets.get(index..index + 2) {
        Some(&[high, low]) => {
            let pointer = (u16::from_be_bytes([high, low]) & !0xc000) as usize;
            if pointer >= chunk_start {
                Err(Error::InvalidPointer)
            } else {
                Ok(pointer)
            }
        }
        _ => Err(Error::UnexpectedEom),
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
