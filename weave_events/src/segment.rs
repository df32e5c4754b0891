//! Splits a boolean series into maximal runs of `true`.
//!
//! The scan is a two-state machine (`Idle`, `InEvent`) walked once, in time
//! order. A run still open when the series ends is closed at the last stamp
//! and emitted like any other.

use crate::{
    errors::EventError,
    stamp::Stamp,
    table::{Event, SeriesLabels},
};

enum State<T> {
    Idle,
    InEvent { start: T, end: T },
}

struct Segmenter<'a, T: Stamp> {
    labels: &'a SeriesLabels,
    state: State<T>,
    next_id: usize,
    events: Vec<Event<T>>,
}

impl<'a, T: Stamp> Segmenter<'a, T> {
    fn new(labels: &'a SeriesLabels) -> Self {
        Self {
            labels,
            state: State::Idle,
            next_id: 0,
            events: Vec::new(),
        }
    }

    fn step(&mut self, t: T, met: bool) {
        self.state = match (std::mem::replace(&mut self.state, State::Idle), met) {
            (State::Idle, true) => State::InEvent { start: t, end: t },
            (State::Idle, false) => State::Idle,
            (State::InEvent { start, .. }, true) => State::InEvent { start, end: t },
            (State::InEvent { start, end }, false) => {
                self.emit(start, end);
                State::Idle
            }
        };
    }

    fn finish(mut self) -> Vec<Event<T>> {
        if let State::InEvent { start, end } = std::mem::replace(&mut self.state, State::Idle) {
            self.emit(start, end);
        }
        self.events
    }

    fn emit(&mut self, start: T, end: T) {
        self.events.push(Event {
            model: self.labels.model.clone(),
            scenario: self.labels.scenario.clone(),
            country: self.labels.country.clone(),
            event_id: self.next_id,
            start,
            end,
            duration: T::span(start, end),
            year: None,
        });
        self.next_id += 1;
    }
}

/// Finds every maximal run of `true` in `condition`, numbering the runs from
/// 0 in time order.
///
/// `times` and `condition` are parallel; an empty input yields no events.
pub fn segment<T: Stamp>(
    times: &[T],
    condition: &[bool],
    labels: &SeriesLabels,
) -> Result<Vec<Event<T>>, EventError> {
    if times.len() != condition.len() {
        return Err(EventError::LengthMismatch {
            times: times.len(),
            values: condition.len(),
        });
    }
    let mut segmenter = Segmenter::new(labels);
    for (t, met) in times.iter().zip(condition) {
        segmenter.step(*t, *met);
    }
    Ok(segmenter.finish())
}
