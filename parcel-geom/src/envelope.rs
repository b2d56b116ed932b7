//! Emprise (bounding box) d'un arbre de coordonnées

use bytes::BufMut;
use serde_json::Value;

use crate::tree::CoordTree;
use crate::types::Coord;

/// Valeur sentinelle des minima avant tout point
const SENTINEL_MIN: f64 = 1e10;
/// Valeur sentinelle des maxima avant tout point
const SENTINEL_MAX: f64 = -1e10;

/// Emprise alignée sur les axes (min_x, max_x, min_y, max_y).
///
/// [`Envelope::EMPTY`] porte des sentinelles (min > max) : une emprise vide
/// signifie qu'aucun point n'a été vu.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Envelope {
    pub const EMPTY: Envelope = Envelope {
        min_x: SENTINEL_MIN,
        max_x: SENTINEL_MAX,
        min_y: SENTINEL_MIN,
        max_y: SENTINEL_MAX,
    };

    /// Taille de l'emprise sérialisée dans un blob GeoPackage
    pub const ENCODED_LEN: usize = 32;

    /// Calcule l'emprise de n'importe quel arbre (Point à MultiPolygon)
    pub fn of<T: CoordTree>(tree: &T) -> Self {
        let mut env = Self::EMPTY;
        tree.visit(&mut |c| env.expand(c));
        env
    }

    /// Calcule l'emprise d'un arbre JSON non décodé.
    ///
    /// Une liste d'au moins deux éléments dont les deux premiers sont
    /// numériques est traitée comme une paire ; toute autre liste est
    /// parcourue récursivement. Les valeurs non numériques sont ignorées.
    pub fn from_json(value: &Value) -> Self {
        let mut env = Self::EMPTY;
        env.fold_json(value);
        env
    }

    fn fold_json(&mut self, value: &Value) {
        let Some(items) = value.as_array() else {
            return;
        };
        if items.len() >= 2 {
            if let (Some(x), Some(y)) = (items[0].as_f64(), items[1].as_f64()) {
                self.expand(&Coord::new(x, y));
                return;
            }
        }
        for item in items {
            self.fold_json(item);
        }
    }

    pub fn expand(&mut self, c: &Coord) {
        self.min_x = self.min_x.min(c.x);
        self.max_x = self.max_x.max(c.x);
        self.min_y = self.min_y.min(c.y);
        self.max_y = self.max_y.max(c.y);
    }

    /// Union de deux emprises (commutative, associative, `EMPTY` neutre)
    pub fn union(self, other: Envelope) -> Envelope {
        Envelope {
            min_x: self.min_x.min(other.min_x),
            max_x: self.max_x.max(other.max_x),
            min_y: self.min_y.min(other.min_y),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Vrai si aucun point n'a été observé
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn contains(&self, c: &Coord) -> bool {
        self.min_x <= c.x && c.x <= self.max_x && self.min_y <= c.y && c.y <= self.max_y
    }

    /// Écrit min_x, max_x, min_y, max_y en f64 little-endian, dans cet ordre
    pub fn write_le<B: BufMut>(&self, buf: &mut B) {
        buf.put_f64_le(self.min_x);
        buf.put_f64_le(self.max_x);
        buf.put_f64_le(self.min_y);
        buf.put_f64_le(self.max_y);
    }

    /// Lit l'emprise écrite par [`Envelope::write_le`]
    pub fn read_le(bytes: &[u8; Self::ENCODED_LEN]) -> Self {
        let f = |i: usize| {
            let mut b = [0u8; 8];
            b.copy_from_slice(&bytes[i * 8..i * 8 + 8]);
            f64::from_le_bytes(b)
        };
        Envelope {
            min_x: f(0),
            max_x: f(1),
            min_y: f(2),
            max_y: f(3),
        }
    }
}
