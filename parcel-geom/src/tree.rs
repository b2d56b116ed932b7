//! Arbre de coordonnées générique
//!
//! Un Point est une feuille, une LineString une liste de feuilles, un
//! Polygon une liste de listes, un MultiPolygon une liste de polygones.
//! Le trait [`CoordTree`] est implémenté une fois pour la feuille [`Coord`]
//! et une fois pour `Vec<T>` : décodage JSON, parcours, projection et
//! sérialisation WKB partagent ainsi la même récursion quel que soit le type.

use bytes::BufMut;
use serde_json::Value;

use crate::error::{GeomError, Result};
use crate::types::Coord;

/// Arbre de coordonnées de profondeur quelconque
pub trait CoordTree: Sized {
    /// Représentation imbriquée en positions `[x, y]` (format GeoJSON)
    type Positions;

    /// Décode l'arbre depuis la valeur JSON `coordinates`
    fn from_json(value: &Value) -> Result<Self>;

    /// Appelle `f` sur chaque feuille, dans l'ordre du document
    fn visit<F: FnMut(&Coord)>(&self, f: &mut F);

    /// Copie l'arbre en transformant chaque feuille
    fn try_map<F>(&self, f: &mut F) -> Result<Self>
    where
        F: FnMut(Coord) -> Result<Coord>;

    /// Écrit la charge utile WKB (little-endian) : compteur u32 par niveau
    /// de liste, puis x et y en f64 pour chaque feuille
    fn write_wkb<B: BufMut>(&self, buf: &mut B) -> Result<()>;

    /// Taille en octets de [`CoordTree::write_wkb`]
    fn wkb_len(&self) -> usize;

    fn to_positions(&self) -> Self::Positions;
}

impl CoordTree for Coord {
    type Positions = Vec<f64>;

    fn from_json(value: &Value) -> Result<Self> {
        let pair = match value.as_array() {
            Some(items) if items.len() >= 2 => items,
            _ => {
                return Err(GeomError::malformed(format!(
                    "expected a coordinate pair, got {}",
                    json_kind(value)
                )))
            }
        };

        match (pair[0].as_f64(), pair[1].as_f64()) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Ok(Coord { x, y }),
            _ => Err(GeomError::malformed(format!(
                "non-numeric coordinate pair [{}, {}]",
                pair[0], pair[1]
            ))),
        }
    }

    fn visit<F: FnMut(&Coord)>(&self, f: &mut F) {
        f(self)
    }

    fn try_map<F>(&self, f: &mut F) -> Result<Self>
    where
        F: FnMut(Coord) -> Result<Coord>,
    {
        f(*self)
    }

    fn write_wkb<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        buf.put_f64_le(self.x);
        buf.put_f64_le(self.y);
        Ok(())
    }

    fn wkb_len(&self) -> usize {
        16
    }

    fn to_positions(&self) -> Vec<f64> {
        vec![self.x, self.y]
    }
}

impl<T: CoordTree> CoordTree for Vec<T> {
    type Positions = Vec<T::Positions>;

    fn from_json(value: &Value) -> Result<Self> {
        let items = value.as_array().ok_or_else(|| {
            GeomError::malformed(format!("expected an array, got {}", json_kind(value)))
        })?;
        if items.is_empty() {
            return Err(GeomError::malformed("empty coordinate array"));
        }
        items.iter().map(T::from_json).collect()
    }

    fn visit<F: FnMut(&Coord)>(&self, f: &mut F) {
        for child in self {
            child.visit(f);
        }
    }

    fn try_map<F>(&self, f: &mut F) -> Result<Self>
    where
        F: FnMut(Coord) -> Result<Coord>,
    {
        self.iter().map(|child| child.try_map(f)).collect()
    }

    fn write_wkb<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        let count = u32::try_from(self.len())
            .map_err(|_| GeomError::malformed(format!("too many elements: {}", self.len())))?;
        buf.put_u32_le(count);
        for child in self {
            child.write_wkb(buf)?;
        }
        Ok(())
    }

    fn wkb_len(&self) -> usize {
        4 + self.iter().map(CoordTree::wkb_len).sum::<usize>()
    }

    fn to_positions(&self) -> Self::Positions {
        self.iter().map(CoordTree::to_positions).collect()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(a) if a.len() < 2 => "a short array",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
