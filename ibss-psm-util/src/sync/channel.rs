//! A bounded single-consumer event channel.
//!
//! Producers are typically interrupt handlers: [`EventChannel::send()`] never
//! blocks and fails if the channel is full. The single consumer may either
//! poll with [`EventChannel::try_receive()`] or await the next event with
//! [`EventChannel::receive()`].
//!
//! Producers that mix requests with pure wake-up notifications use
//! [`EventChannel::send_evicting()`] so that a full channel sheds the
//! wake-ups first.
use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll, Waker},
};

use heapless::Deque;

use crate::{sync::IrqCell, Error, Result};

struct ChannelState<T, const N: usize> {
    events: Deque<T, N>,
    waker: Option<Waker>,
}

pub struct EventChannel<T, const N: usize> {
    state: IrqCell<ChannelState<T, N>>,
}

impl<T, const N: usize> EventChannel<T, N> {
    pub const fn new() -> Self {
        Self {
            state: IrqCell::new(ChannelState {
                events: Deque::new(),
                waker: None,
            }),
        }
    }

    /// Posts an event and wakes a pending receiver.
    ///
    /// Returns an error and drops the event if the channel is full.
    pub fn send(&self, event: T) -> Result<()> {
        let (result, waker) = self.state.lock(|state| {
            let result = state.events.push_back(event).map_err(|_| Error);
            (result, state.waker.take())
        });

        // Wake outside the critical section.
        if let Some(waker) = waker {
            waker.wake();
        }

        result
    }

    /// Posts an event, making room in a full channel by dropping the oldest
    /// pending event that `evictable` accepts.
    ///
    /// An evictable event itself never displaces another one, it is dropped
    /// if the channel is full. Returns an error if the event was dropped.
    pub fn send_evicting(&self, event: T, evictable: impl Fn(&T) -> bool) -> Result<()> {
        let (result, waker) = self.state.lock(|state| {
            if state.events.is_full() && !evictable(&event) {
                evict_oldest(&mut state.events, &evictable);
            }
            let result = state.events.push_back(event).map_err(|_| Error);
            (result, state.waker.take())
        });

        if let Some(waker) = waker {
            waker.wake();
        }

        result
    }

    /// Whether an event equal to `event` is pending.
    pub fn contains(&self, event: &T) -> bool
    where
        T: PartialEq,
    {
        self.state
            .lock(|state| state.events.iter().any(|pending| pending == event))
    }

    /// Removes the oldest pending event, if any.
    pub fn try_receive(&self) -> Option<T> {
        self.state.lock(|state| state.events.pop_front())
    }

    /// Waits until an event is available and removes it.
    pub fn receive(&self) -> impl Future<Output = T> + '_ {
        ReceiveFuture { channel: self }
    }

    pub fn len(&self) -> usize {
        self.state.lock(|state| state.events.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all pending events.
    pub fn clear(&self) {
        self.state.lock(|state| state.events.clear())
    }
}

/// Removes the oldest event matching `evictable`, keeping the order of the
/// others.
fn evict_oldest<T, const N: usize>(events: &mut Deque<T, N>, evictable: impl Fn(&T) -> bool) {
    let mut evicted = false;
    for _ in 0..events.len() {
        let Some(event) = events.pop_front() else {
            break;
        };
        if !evicted && evictable(&event) {
            evicted = true;
            continue;
        }
        // An entry was just taken, there is room.
        let _ = events.push_back(event);
    }
}

impl<T, const N: usize> Default for EventChannel<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

struct ReceiveFuture<'ch, T, const N: usize> {
    channel: &'ch EventChannel<T, N>,
}

impl<T, const N: usize> Future for ReceiveFuture<'_, T, N> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.channel.state.lock(|state| match state.events.pop_front() {
            Some(event) => Poll::Ready(event),
            None => {
                match &mut state.waker {
                    Some(waker) if waker.will_wake(cx.waker()) => {}
                    waker => *waker = Some(cx.waker().clone()),
                }
                Poll::Pending
            }
        })
    }
}
