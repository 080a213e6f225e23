//! Bounded in-memory feed state.
//!
//! Folds decoded channel payloads into:
//! - latest mid per coin (`allMids`)
//! - a bounded trade tape per coin (`trades`)
//! - top of book per coin (`l2Book`)
//! - the watched account's margin snapshot (`webData2`)
//!
//! Prices arrive as decimal strings and are parsed once here. A payload with
//! an unparseable number is rejected as a whole and logged; state is left as
//! it was.

use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use hlx_core::OrderSide;
use hlx_ws::{
    AllMids, ChannelPayload, ConnectionManager, L2Book, L2Level, ListenerId, Subscription, Trade,
    WebData2, WsResult,
};
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::{FeedError, FeedResult};

/// Default trade tape length per coin.
pub const DEFAULT_TAPE_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct Mid {
    pub px: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TapeTrade {
    pub px: Decimal,
    pub sz: Decimal,
    pub side: Option<OrderSide>,
    pub time: DateTime<Utc>,
    pub tid: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookLevel {
    pub px: Decimal,
    pub sz: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookTop {
    pub bid: Option<BookLevel>,
    pub ask: Option<BookLevel>,
    pub time: DateTime<Utc>,
}

impl BookTop {
    pub fn spread(&self) -> Option<Decimal> {
        match (&self.bid, &self.ask) {
            (Some(bid), Some(ask)) => Some(ask.px - bid.px),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub user: Option<String>,
    pub account_value: Decimal,
    pub total_margin_used: Option<Decimal>,
    pub withdrawable: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

/// Listener registrations made by [`FeedState::attach`] and
/// [`FeedState::subscribe_coin`].
#[derive(Debug, Clone, Default)]
pub struct Attachment {
    pub listeners: Vec<(String, ListenerId)>,
    pub subscriptions: Vec<(Subscription, ListenerId)>,
    /// Coin whose trade feed this attachment holds.
    pub trade_coin: Option<String>,
}

/// Aggregated feed state.
pub struct FeedState {
    tape_len: usize,
    mids: DashMap<String, Mid>,
    tapes: DashMap<String, VecDeque<TapeTrade>>,
    books: DashMap<String, BookTop>,
    account: RwLock<Option<AccountSnapshot>>,
    /// Coins with a live `subscribe_coin` attachment, with their counts.
    trade_coins: Mutex<HashMap<String, usize>>,
}

impl FeedState {
    pub fn new(tape_len: usize) -> Self {
        Self {
            tape_len: tape_len.max(1),
            mids: DashMap::new(),
            tapes: DashMap::new(),
            books: DashMap::new(),
            account: RwLock::new(None),
            trade_coins: Mutex::new(HashMap::new()),
        }
    }

    /// Fold one payload into state. Channels without state are ignored.
    pub fn apply(&self, payload: &ChannelPayload) -> FeedResult<()> {
        match payload {
            ChannelPayload::AllMids(mids) => self.apply_mids(mids),
            ChannelPayload::Trades(trades) => self.apply_trades(None, trades),
            ChannelPayload::L2Book(book) => self.apply_book(book),
            ChannelPayload::WebData2(data) => self.apply_account(data),
            _ => Ok(()),
        }
    }

    pub fn apply_mids(&self, mids: &AllMids) -> FeedResult<()> {
        let now = Utc::now();
        let parsed = mids
            .mids
            .iter()
            .map(|(coin, px)| Ok((coin.clone(), parse_decimal("mid", px)?)))
            .collect::<FeedResult<Vec<_>>>()?;

        for (coin, px) in parsed {
            self.mids.insert(coin, Mid { px, updated_at: now });
        }
        Ok(())
    }

    /// Append trades to their coin's tape, oldest dropped first.
    ///
    /// With `coin` set, only trades for that coin are kept. A trade without a
    /// coin is kept under `coin` only while no other coin is subscribed
    /// through [`FeedState::subscribe_coin`]; otherwise it cannot be routed
    /// and is dropped.
    pub fn apply_trades(&self, coin: Option<&str>, trades: &[Trade]) -> FeedResult<()> {
        let coinless_target = coin.filter(|c| self.is_sole_trade_coin(c));
        let mut parsed = Vec::with_capacity(trades.len());
        let mut unrouted = 0usize;
        for trade in trades {
            let key = match (coin, trade.coin.as_str()) {
                (_, "") => match coinless_target {
                    Some(target) => target,
                    None => {
                        unrouted += 1;
                        continue;
                    }
                },
                (Some(want), got) if got != want => continue,
                (_, got) => got,
            };
            parsed.push((key.to_string(), to_tape_trade(trade)?));
        }
        if unrouted > 0 {
            debug!(unrouted, "Dropping trades without a coin");
        }

        for (key, trade) in parsed {
            let mut tape = self.tapes.entry(key).or_default();
            tape.push_back(trade);
            while tape.len() > self.tape_len {
                tape.pop_front();
            }
        }
        Ok(())
    }

    pub fn apply_book(&self, book: &L2Book) -> FeedResult<()> {
        let top = BookTop {
            bid: book.best_bid().map(to_book_level).transpose()?,
            ask: book.best_ask().map(to_book_level).transpose()?,
            time: from_millis(book.time)?,
        };
        self.books.insert(book.coin.clone(), top);
        Ok(())
    }

    pub fn apply_account(&self, data: &WebData2) -> FeedResult<()> {
        let Some(state) = &data.clearinghouse_state else {
            debug!("webData2 without clearinghouseState");
            return Ok(());
        };
        let summary = &state.margin_summary;
        let snapshot = AccountSnapshot {
            user: data.user.clone(),
            account_value: parse_decimal("accountValue", &summary.account_value)?,
            total_margin_used: summary
                .total_margin_used
                .as_deref()
                .map(|v| parse_decimal("totalMarginUsed", v))
                .transpose()?,
            withdrawable: state
                .withdrawable
                .as_deref()
                .map(|v| parse_decimal("withdrawable", v))
                .transpose()?,
            updated_at: Utc::now(),
        };
        *self.account.write() = Some(snapshot);
        Ok(())
    }

    fn is_sole_trade_coin(&self, coin: &str) -> bool {
        self.trade_coins.lock().keys().all(|c| c == coin)
    }

    pub fn mid(&self, coin: &str) -> Option<Mid> {
        self.mids.get(coin).map(|m| m.clone())
    }

    pub fn mid_count(&self) -> usize {
        self.mids.len()
    }

    /// Tape for `coin`, oldest first.
    pub fn recent_trades(&self, coin: &str) -> Vec<TapeTrade> {
        self.tapes
            .get(coin)
            .map(|tape| tape.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn last_trade(&self, coin: &str) -> Option<TapeTrade> {
        self.tapes.get(coin).and_then(|tape| tape.back().cloned())
    }

    pub fn book_top(&self, coin: &str) -> Option<BookTop> {
        self.books.get(coin).map(|b| b.clone())
    }

    pub fn account(&self) -> Option<AccountSnapshot> {
        self.account.read().clone()
    }

    /// Listen on the manager-owned feeds (`allMids`, `webData2`).
    ///
    /// No wire traffic; works before the socket is open.
    pub fn attach(self: &Arc<Self>, manager: &ConnectionManager) -> Attachment {
        let mut attachment = Attachment::default();
        for channel in ["allMids", "webData2"] {
            let state = Arc::clone(self);
            let id = manager.add_listener(
                channel,
                Arc::new(move |payload: &ChannelPayload| {
                    if let Err(e) = state.apply(payload) {
                        warn!(error = %e, "Dropping feed update");
                    }
                }),
            );
            attachment.listeners.push((channel.to_string(), id));
        }
        attachment
    }

    /// Open the trades and book feeds for `coin`.
    ///
    /// Requires an open connection. On failure, feeds opened by this call
    /// are closed again.
    pub fn subscribe_coin(
        self: &Arc<Self>,
        manager: &ConnectionManager,
        coin: &str,
    ) -> WsResult<Attachment> {
        let mut attachment = Attachment::default();

        let trades = Subscription::trades(coin);
        let state = Arc::clone(self);
        let trade_coin = coin.to_string();
        let id = manager.subscribe(
            trades.clone(),
            Arc::new(move |payload: &ChannelPayload| {
                if let ChannelPayload::Trades(trades) = payload {
                    if let Err(e) = state.apply_trades(Some(&trade_coin), trades) {
                        warn!(coin = %trade_coin, error = %e, "Dropping trades update");
                    }
                }
            }),
        )?;
        attachment.subscriptions.push((trades, id));
        *self.trade_coins.lock().entry(coin.to_string()).or_default() += 1;
        attachment.trade_coin = Some(coin.to_string());

        let book = Subscription::l2_book(coin);
        let state = Arc::clone(self);
        let book_coin = coin.to_string();
        let result = manager.subscribe(
            book.clone(),
            Arc::new(move |payload: &ChannelPayload| {
                if let ChannelPayload::L2Book(book) = payload {
                    if book.coin != book_coin {
                        return;
                    }
                    if let Err(e) = state.apply_book(book) {
                        warn!(coin = %book_coin, error = %e, "Dropping book update");
                    }
                }
            }),
        );
        match result {
            Ok(id) => attachment.subscriptions.push((book, id)),
            Err(e) => {
                self.detach(manager, &attachment);
                return Err(e);
            }
        }
        Ok(attachment)
    }

    /// Undo an [`Attachment`]. Feeds left without listeners are closed.
    pub fn detach(&self, manager: &ConnectionManager, attachment: &Attachment) {
        for (channel, id) in &attachment.listeners {
            manager.remove_listener(channel, *id);
        }
        for (subscription, id) in &attachment.subscriptions {
            if let Err(e) = manager.unsubscribe(subscription, Some(*id)) {
                warn!(?subscription, error = %e, "Failed to close feed");
            }
        }
        if let Some(coin) = &attachment.trade_coin {
            let mut coins = self.trade_coins.lock();
            if let Some(count) = coins.get_mut(coin) {
                *count -= 1;
                if *count == 0 {
                    coins.remove(coin);
                }
            }
        }
    }
}

impl Default for FeedState {
    fn default() -> Self {
        Self::new(DEFAULT_TAPE_LEN)
    }
}

fn parse_decimal(field: &str, value: &str) -> FeedResult<Decimal> {
    Decimal::from_str(value)
        .map_err(|e| FeedError::InvalidData(format!("{field}={value:?}: {e}")))
}

fn from_millis(ms: u64) -> FeedResult<DateTime<Utc>> {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| FeedError::InvalidData(format!("timestamp out of range: {ms}")))
}

fn to_tape_trade(trade: &Trade) -> FeedResult<TapeTrade> {
    Ok(TapeTrade {
        px: parse_decimal("px", &trade.px)?,
        sz: parse_decimal("sz", &trade.sz)?,
        side: trade.side(),
        time: from_millis(trade.time)?,
        tid: trade.tid,
    })
}

fn to_book_level(level: &L2Level) -> FeedResult<BookLevel> {
    Ok(BookLevel {
        px: parse_decimal("px", &level.px)?,
        sz: parse_decimal("sz", &level.sz)?,
    })
}
