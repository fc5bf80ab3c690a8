//! Genetic code tables and amino-acid identities.
//!
//! Tables are built from NCBI `ncbieaa` strings: 64 residues in TCAG order
//! (TTT, TTC, TTA, TTG, TCT, ...).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The 20 standard residues plus the stop signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AminoAcid {
    Ala,
    Arg,
    Asn,
    Asp,
    Cys,
    Gln,
    Glu,
    Gly,
    His,
    Ile,
    Leu,
    Lys,
    Met,
    Phe,
    Pro,
    Ser,
    Thr,
    Trp,
    Tyr,
    Val,
    Stop,
}

impl AminoAcid {
    pub const ALL: [AminoAcid; 21] = [
        AminoAcid::Ala,
        AminoAcid::Arg,
        AminoAcid::Asn,
        AminoAcid::Asp,
        AminoAcid::Cys,
        AminoAcid::Gln,
        AminoAcid::Glu,
        AminoAcid::Gly,
        AminoAcid::His,
        AminoAcid::Ile,
        AminoAcid::Leu,
        AminoAcid::Lys,
        AminoAcid::Met,
        AminoAcid::Phe,
        AminoAcid::Pro,
        AminoAcid::Ser,
        AminoAcid::Thr,
        AminoAcid::Trp,
        AminoAcid::Tyr,
        AminoAcid::Val,
        AminoAcid::Stop,
    ];

    pub fn from_one_letter(c: char) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|aa| aa.one_letter() == c.to_ascii_uppercase())
    }

    pub fn one_letter(self) -> char {
        match self {
            AminoAcid::Ala => 'A',
            AminoAcid::Arg => 'R',
            AminoAcid::Asn => 'N',
            AminoAcid::Asp => 'D',
            AminoAcid::Cys => 'C',
            AminoAcid::Gln => 'Q',
            AminoAcid::Glu => 'E',
            AminoAcid::Gly => 'G',
            AminoAcid::His => 'H',
            AminoAcid::Ile => 'I',
            AminoAcid::Leu => 'L',
            AminoAcid::Lys => 'K',
            AminoAcid::Met => 'M',
            AminoAcid::Phe => 'F',
            AminoAcid::Pro => 'P',
            AminoAcid::Ser => 'S',
            AminoAcid::Thr => 'T',
            AminoAcid::Trp => 'W',
            AminoAcid::Tyr => 'Y',
            AminoAcid::Val => 'V',
            AminoAcid::Stop => '*',
        }
    }

    pub fn three_letter(self) -> &'static str {
        match self {
            AminoAcid::Ala => "Ala",
            AminoAcid::Arg => "Arg",
            AminoAcid::Asn => "Asn",
            AminoAcid::Asp => "Asp",
            AminoAcid::Cys => "Cys",
            AminoAcid::Gln => "Gln",
            AminoAcid::Glu => "Glu",
            AminoAcid::Gly => "Gly",
            AminoAcid::His => "His",
            AminoAcid::Ile => "Ile",
            AminoAcid::Leu => "Leu",
            AminoAcid::Lys => "Lys",
            AminoAcid::Met => "Met",
            AminoAcid::Phe => "Phe",
            AminoAcid::Pro => "Pro",
            AminoAcid::Ser => "Ser",
            AminoAcid::Thr => "Thr",
            AminoAcid::Trp => "Trp",
            AminoAcid::Tyr => "Tyr",
            AminoAcid::Val => "Val",
            AminoAcid::Stop => "Ter",
        }
    }

    pub fn is_stop(self) -> bool {
        self == AminoAcid::Stop
    }
}

impl fmt::Display for AminoAcid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.three_letter())
    }
}

/// A codon → amino acid table.
#[derive(Debug, Clone)]
pub struct GeneticCode {
    /// NCBI genetic code ID
    pub id: u8,
    pub name: &'static str,
    table: HashMap<[u8; 3], AminoAcid>,
}

const STANDARD: &str = "FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG";
const VERTEBRATE_MITOCHONDRIAL: &str =
    "FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIMMTTTTNNKKSS**VVVVAAAADDEEGGGG";
const BACTERIAL_PLASTID: &str = "FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG";

impl GeneticCode {
    fn from_ncbieaa(id: u8, name: &'static str, ncbieaa: &str) -> Self {
        let bases = [b'T', b'C', b'A', b'G'];
        let residues: Vec<char> = ncbieaa.chars().collect();
        let mut table = HashMap::with_capacity(64);

        let mut idx = 0;
        for &b1 in &bases {
            for &b2 in &bases {
                for &b3 in &bases {
                    if let Some(aa) = residues.get(idx).and_then(|&c| AminoAcid::from_one_letter(c)) {
                        table.insert([b1, b2, b3], aa);
                    }
                    idx += 1;
                }
            }
        }

        Self { id, name, table }
    }

    pub fn standard() -> Self {
        Self::from_ncbieaa(1, "Standard", STANDARD)
    }

    /// Look up an NCBI table by id; only the tables a genome browser needs are bundled.
    pub fn by_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::standard()),
            2 => Some(Self::from_ncbieaa(2, "Vertebrate Mitochondrial", VERTEBRATE_MITOCHONDRIAL)),
            11 => Some(Self::from_ncbieaa(11, "Bacterial, Archaeal and Plant Plastid", BACTERIAL_PLASTID)),
            _ => None,
        }
    }

    /// Translate one triplet. Case-insensitive, `U` reads as `T`; masked,
    /// gapped or ambiguous bases give `None`.
    pub fn translate(&self, triplet: [u8; 3]) -> Option<AminoAcid> {
        let mut key = [0u8; 3];
        for (slot, &base) in key.iter_mut().zip(&triplet) {
            *slot = match base.to_ascii_uppercase() {
                b'U' => b'T',
                b @ (b'A' | b'C' | b'G' | b'T') => b,
                _ => return None,
            };
        }
        self.table.get(&key).copied()
    }

    /// Translate a string codon such as `"ATG"`.
    pub fn translate_str(&self, codon: &str) -> Option<AminoAcid> {
        let bytes: [u8; 3] = codon.as_bytes().try_into().ok()?;
        self.translate(bytes)
    }
}

impl Default for GeneticCode {
    fn default() -> Self {
        Self::standard()
    }
}

/// Watson-Crick complement; anything unrecognised maps to `N`.
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' | b'U' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'a' => b't',
        b't' | b'u' => b'a',
        b'c' => b'g',
        b'g' => b'c',
        _ => b'N',
    }
}
