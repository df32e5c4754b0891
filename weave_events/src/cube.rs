//! Labeled multi-dimensional arrays.
//!
//! A [`LabeledArray`] holds one value per (label combination, time stamp).
//! Label dimensions are named (`country`, `scenario`, `model`, `tech`, ...)
//! and ordered; the time axis is always innermost, so every label combination
//! owns one contiguous time slice of the data buffer.
//!
//! Dimensions of size one can be squeezed into *scalar coordinates*: the
//! dimension disappears from the shape but its single label stays attached
//! to the array, so downstream code can still name the series it scans.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    errors::EventError,
    series::TimeSeries,
    stamp::{Stamp, check_strictly_increasing},
};

/// A named label dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dim {
    /// Dimension name, e.g. `"scenario"`.
    pub name: String,
    /// Labels along the dimension, in axis order.
    pub labels: Vec<String>,
}

impl Dim {
    /// Creates a dimension from anything string-like.
    pub fn new<S: Into<String>>(name: impl Into<String>, labels: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// `true` if the dimension has no labels.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Position of `label` along the dimension.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }
}

/// Values laid out over named label dimensions and a time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledArray<V, T> {
    time: Vec<T>,
    dims: Vec<Dim>,
    scalars: IndexMap<String, String>,
    data: Vec<V>,
}

impl<V, T: Stamp> LabeledArray<V, T> {
    /// Builds an array from its axes and a row-major data buffer
    /// (label dimensions outermost in the given order, time innermost).
    pub fn new(time: Vec<T>, dims: Vec<Dim>, data: Vec<V>) -> Result<Self, EventError> {
        check_strictly_increasing(&time)?;
        let mut seen = BTreeSet::new();
        for d in &dims {
            if !seen.insert(d.name.as_str()) {
                return Err(EventError::DuplicateDimension(d.name.clone()));
            }
        }
        let expected = combination_count(&dims) * time.len();
        if expected != data.len() {
            return Err(EventError::ShapeMismatch {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            time,
            dims,
            scalars: IndexMap::new(),
            data,
        })
    }

    /// Builds an array with every cell set to `fill`.
    pub fn filled(time: Vec<T>, dims: Vec<Dim>, fill: V) -> Result<Self, EventError>
    where
        V: Clone,
    {
        let len = combination_count(&dims) * time.len();
        Self::new(time, dims, vec![fill; len])
    }

    /// Attaches a scalar coordinate (a dimension squeezed to a single label).
    pub fn with_scalar(
        mut self,
        name: impl Into<String>,
        label: impl Into<String>,
    ) -> Result<Self, EventError> {
        let name = name.into();
        if self.dim(&name).is_some() || self.scalars.contains_key(&name) {
            return Err(EventError::DuplicateDimension(name));
        }
        self.scalars.insert(name, label.into());
        Ok(self)
    }

    /// The time axis.
    pub fn time(&self) -> &[T] {
        &self.time
    }

    /// Label dimensions, outermost first.
    pub fn dims(&self) -> &[Dim] {
        &self.dims
    }

    /// A label dimension by name.
    pub fn dim(&self, name: &str) -> Option<&Dim> {
        self.dims.iter().find(|d| d.name == name)
    }

    /// Scalar coordinates left behind by squeezed dimensions.
    pub fn scalars(&self) -> &IndexMap<String, String> {
        &self.scalars
    }

    /// A scalar coordinate by name.
    pub fn scalar(&self, name: &str) -> Option<&str> {
        self.scalars.get(name).map(String::as_str)
    }

    /// Every label a dimension contributes: its axis labels, or the single
    /// scalar label if it was squeezed.
    pub fn labels_of(&self, name: &str) -> Option<Vec<&str>> {
        if let Some(d) = self.dim(name) {
            return Some(d.labels.iter().map(String::as_str).collect());
        }
        self.scalar(name).map(|s| vec![s])
    }

    /// The raw row-major buffer.
    pub fn data(&self) -> &[V] {
        &self.data
    }

    /// Number of label combinations (product of dimension sizes).
    pub fn combination_count(&self) -> usize {
        combination_count(&self.dims)
    }

    /// Value at the given per-dimension positions and time position.
    pub fn get(&self, positions: &[usize], t: usize) -> Option<&V> {
        let i = self.offset(positions, t)?;
        self.data.get(i)
    }

    /// Mutable value at the given per-dimension positions and time position.
    pub fn get_mut(&mut self, positions: &[usize], t: usize) -> Option<&mut V> {
        let i = self.offset(positions, t)?;
        self.data.get_mut(i)
    }

    /// Iterates label combinations in row-major order, yielding the label of
    /// every dimension (in dimension order) and the combination's time slice.
    pub fn combinations(&self) -> impl Iterator<Item = (Vec<&str>, &[V])> + '_ {
        let nt = self.time.len();
        (0..self.combination_count()).map(move |c| {
            let labels = self
                .positions_of(c)
                .into_iter()
                .zip(&self.dims)
                .map(|(p, d)| d.labels[p].as_str())
                .collect();
            (labels, &self.data[c * nt..(c + 1) * nt])
        })
    }

    /// The time slice selected by one label per dimension.
    pub fn slice(&self, selector: &[(&str, &str)]) -> Result<&[V], EventError> {
        let mut positions = Vec::with_capacity(self.dims.len());
        for d in &self.dims {
            let (_, label) = selector
                .iter()
                .find(|(name, _)| *name == d.name)
                .ok_or_else(|| EventError::MissingDimension(d.name.clone()))?;
            let p = d.position(label).ok_or_else(|| EventError::UnknownLabel {
                dim: d.name.clone(),
                label: (*label).to_string(),
            })?;
            positions.push(p);
        }
        let nt = self.time.len();
        let c = self.combination_of(&positions);
        Ok(&self.data[c * nt..(c + 1) * nt])
    }

    /// Moves every size-one dimension into the scalar coordinates.
    pub fn squeeze(self) -> Self {
        let Self {
            time,
            dims,
            mut scalars,
            data,
        } = self;
        let mut kept = Vec::with_capacity(dims.len());
        for mut d in dims {
            if d.len() == 1 {
                let label = d.labels.pop().unwrap_or_default();
                scalars.insert(d.name, label);
            } else {
                kept.push(d);
            }
        }
        // Dropping size-one axes leaves the row-major order untouched.
        Self {
            time,
            dims: kept,
            scalars,
            data,
        }
    }

    /// Keeps only `labels` (in the given order) along dimension `name`.
    pub fn select(&self, name: &str, labels: &[&str]) -> Result<Self, EventError>
    where
        V: Clone,
    {
        let axis = self
            .dims
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| EventError::MissingDimension(name.to_string()))?;
        let mut picks = Vec::with_capacity(labels.len());
        for label in labels {
            let p = self.dims[axis]
                .position(label)
                .ok_or_else(|| EventError::UnknownLabel {
                    dim: name.to_string(),
                    label: (*label).to_string(),
                })?;
            picks.push(p);
        }

        let mut dims = self.dims.clone();
        dims[axis].labels = labels.iter().map(|l| (*l).to_string()).collect();

        let nt = self.time.len();
        let mut data = Vec::with_capacity(combination_count(&dims) * nt);
        for c in 0..combination_count(&dims) {
            let mut positions = positions_in(&dims, c);
            positions[axis] = picks[positions[axis]];
            let src = self.combination_of(&positions);
            data.extend_from_slice(&self.data[src * nt..(src + 1) * nt]);
        }

        Ok(Self {
            time: self.time.clone(),
            dims,
            scalars: self.scalars.clone(),
            data,
        })
    }

    /// Applies `f` to every cell, keeping axes and scalar coordinates.
    pub fn map<U>(&self, f: impl FnMut(&V) -> U) -> LabeledArray<U, T> {
        LabeledArray {
            time: self.time.clone(),
            dims: self.dims.clone(),
            scalars: self.scalars.clone(),
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Outer-joins arrays sharing the same dimension names and scalar
    /// coordinates. Axes become the sorted union of the inputs; uncovered
    /// cells hold `fill`. A cell covered by several inputs takes the value
    /// of the last one.
    pub fn merge(arrays: Vec<Self>, fill: V) -> Result<Self, EventError>
    where
        V: Clone,
        T: Ord,
    {
        let Some(first) = arrays.first() else {
            return Err(EventError::Incompatible("nothing to merge".into()));
        };
        let names: Vec<&str> = first.dims.iter().map(|d| d.name.as_str()).collect();
        for a in &arrays[1..] {
            let other: Vec<&str> = a.dims.iter().map(|d| d.name.as_str()).collect();
            if other != names {
                return Err(EventError::Incompatible(format!(
                    "dimensions {other:?} differ from {names:?}"
                )));
            }
            if a.scalars != first.scalars {
                return Err(EventError::Incompatible(format!(
                    "scalar coordinates {:?} differ from {:?}",
                    a.scalars, first.scalars
                )));
            }
        }

        let time: Vec<T> = arrays
            .iter()
            .flat_map(|a| a.time.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let dims: Vec<Dim> = names
            .iter()
            .enumerate()
            .map(|(axis, name)| {
                let labels: BTreeSet<&str> = arrays
                    .iter()
                    .flat_map(|a| a.dims[axis].labels.iter().map(String::as_str))
                    .collect();
                Dim::new(*name, labels)
            })
            .collect();

        let mut out = Self::filled(time, dims, fill)?;
        out.scalars = first.scalars.clone();

        for a in &arrays {
            let t_map: Vec<usize> = a
                .time
                .iter()
                .map(|t| out.time.binary_search(t).unwrap_or_default())
                .collect();
            let nt = a.time.len();
            for c in 0..a.combination_count() {
                let positions: Vec<usize> = positions_in(&a.dims, c)
                    .into_iter()
                    .enumerate()
                    .map(|(axis, p)| {
                        out.dims[axis]
                            .position(&a.dims[axis].labels[p])
                            .unwrap_or_default()
                    })
                    .collect();
                for (ti, &to) in t_map.iter().enumerate() {
                    if let Some(cell) = out.get_mut(&positions, to) {
                        *cell = a.data[c * nt + ti].clone();
                    }
                }
            }
        }
        Ok(out)
    }

    fn offset(&self, positions: &[usize], t: usize) -> Option<usize> {
        if positions.len() != self.dims.len()
            || t >= self.time.len()
            || positions.iter().zip(&self.dims).any(|(p, d)| *p >= d.len())
        {
            return None;
        }
        Some(self.combination_of(positions) * self.time.len() + t)
    }

    fn combination_of(&self, positions: &[usize]) -> usize {
        positions
            .iter()
            .zip(&self.dims)
            .fold(0, |acc, (p, d)| acc * d.len() + p)
    }

    fn positions_of(&self, combination: usize) -> Vec<usize> {
        positions_in(&self.dims, combination)
    }
}

impl<T: Stamp> LabeledArray<f64, T> {
    /// The numeric series selected by one label per dimension.
    pub fn time_series(&self, selector: &[(&str, &str)]) -> Result<TimeSeries<T>, EventError> {
        let values = self.slice(selector)?.to_vec();
        TimeSeries::new(self.time.clone(), values)
    }
}

fn combination_count(dims: &[Dim]) -> usize {
    dims.iter().map(Dim::len).product()
}

fn positions_in(dims: &[Dim], mut combination: usize) -> Vec<usize> {
    let mut positions = vec![0; dims.len()];
    for (axis, d) in dims.iter().enumerate().rev() {
        let n = d.len().max(1);
        positions[axis] = combination % n;
        combination /= n;
    }
    positions
}

/// First and last calendar year in which `model` has any non-missing value.
///
/// `None` when the model is absent, has only missing values, or the axis is
/// not temporal.
pub fn period_bounds<T: Stamp>(cube: &LabeledArray<f64, T>, model: &str) -> Option<(i32, i32)> {
    let model_axis = cube.dims().iter().position(|d| d.name == "model");
    if model_axis.is_none() && cube.scalar("model") != Some(model) {
        return None;
    }

    let mut bounds: Option<(i32, i32)> = None;
    for (labels, values) in cube.combinations() {
        if let Some(axis) = model_axis {
            if labels[axis] != model {
                continue;
            }
        }
        for (t, v) in cube.time().iter().zip(values) {
            if v.is_nan() {
                continue;
            }
            if let Some(y) = t.year() {
                bounds = Some(match bounds {
                    Some((lo, hi)) => (lo.min(y), hi.max(y)),
                    None => (y, y),
                });
            }
        }
    }
    bounds
}

/// Number of calendar years covered by `model` (inclusive of both ends).
pub fn period_length<T: Stamp>(cube: &LabeledArray<f64, T>, model: &str) -> Option<i32> {
    period_bounds(cube, model).map(|(lo, hi)| hi - lo + 1)
}
