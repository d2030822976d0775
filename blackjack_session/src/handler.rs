//! Request dispatch: verifies the incoming token, applies the action and signs the result.

use crate::codec::SigningKey;
use crate::SessionError;
use blackjack_lib::{Action, RoundState, Shoe, View};
use serde::Serialize;
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

pub const DEFAULT_BET: f64 = 0.01;
pub const DEFAULT_CURRENCY: &str = "SOL";

/// Body of a request to the game endpoint. Every field is optional on the wire, which
/// fields matter depends on `action`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameRequest {
    pub action: Option<String>,
    pub state_token: Option<String>,
    pub public_key: Option<String>,
    pub currency: Option<String>,
    /// A number or a numeric string.
    pub bet: Option<Value>,
}

impl GameRequest {
    /// Reads a request from raw body bytes. Each field is read on its own, so a field of
    /// an unexpected type never affects the others. A body that is not a JSON object is
    /// read as an empty request, which is later rejected as an unknown action.
    pub fn from_body(body: &[u8]) -> GameRequest {
        let fields = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) => {
                debug!("request body is not an object");
                return GameRequest::default();
            }
            Err(e) => {
                debug!(error = %e, "unreadable request body");
                return GameRequest::default();
            }
        };

        GameRequest {
            action: fields
                .get("action")
                .and_then(Value::as_str)
                .map(str::to_string),
            state_token: text_field(fields.get("stateToken")),
            public_key: text_field(fields.get("publicKey")),
            currency: text_field(fields.get("currency")),
            bet: fields.get("bet").cloned(),
        }
    }

    pub fn start() -> GameRequest {
        GameRequest {
            action: Some("start".to_string()),
            ..GameRequest::default()
        }
    }

    pub fn action(action: Action, state_token: impl Into<String>) -> GameRequest {
        let action = match action {
            Action::Hit => "hit",
            Action::Stand => "stand",
            Action::Double => "double",
        };
        GameRequest {
            action: Some(action.to_string()),
            state_token: Some(state_token.into()),
            ..GameRequest::default()
        }
    }

    fn bet_amount(&self) -> Result<f64, SessionError> {
        let bet = match &self.bet {
            None | Some(Value::Null) => return Ok(DEFAULT_BET),
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(_) => None,
        };
        bet.filter(|b| b.is_finite()).ok_or(SessionError::InvalidBet)
    }
}

/// Strings are taken as they are; any other non-null value is kept as its JSON text.
fn text_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// What the client gets back after every successful action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResponse {
    pub state_token: String,
    pub view: View,
}

/// Handles one request from start to finish. Nothing is kept between calls: the returned
/// token is the only record of the round.
pub fn handle(request: GameRequest, key: &SigningKey) -> Result<GameResponse, SessionError> {
    let state = match request.action.as_deref() {
        Some("start") => start_round(&request)?,
        Some(action) => {
            let action = action
                .parse::<Action>()
                .map_err(|_| SessionError::UnknownAction)?;
            play(action, &request, key)?
        }
        None => return Err(SessionError::UnknownAction),
    };

    Ok(GameResponse {
        state_token: key.sign(&state)?,
        view: View::project(&state),
    })
}

fn start_round(request: &GameRequest) -> Result<RoundState, SessionError> {
    let bet = request.bet_amount()?;
    let currency = request
        .currency
        .clone()
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    let state = RoundState::start(
        Shoe::new(),
        bet,
        currency,
        request.public_key.clone(),
        unix_time(),
    );
    debug!(bet, currency = %state.currency, status = %state.status, "dealt new round");
    Ok(state)
}

fn play(
    action: Action,
    request: &GameRequest,
    key: &SigningKey,
) -> Result<RoundState, SessionError> {
    let token = match request.state_token.as_deref() {
        Some(token) if !token.is_empty() => token,
        _ => return Err(SessionError::MissingToken),
    };

    let mut state = key.verify(token).inspect_err(|e| {
        warn!(error = %e, ?action, "rejected state token");
    })?;

    if state.status.is_terminal() {
        debug!(?action, status = %state.status, "action on finished round");
    } else {
        state.apply(action);
        debug!(
            ?action,
            status = %state.status,
            player = state.player_value(),
            "applied action"
        );
    }
    Ok(state)
}

fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod test {
    use super::*;
    use blackjack_lib::{Card, DealerCard, Status};

    fn key() -> SigningKey {
        SigningKey::new("handler test secret")
    }

    /// Signs a round dealt from a shoe that deals `player`, then `dealer`, then `draws`.
    fn rigged_token(key: &SigningKey, player: &[&str], dealer: &[&str], draws: &[&str]) -> String {
        let mut order: Vec<Card> = player
            .iter()
            .chain(dealer)
            .chain(draws)
            .map(|c| c.parse().unwrap())
            .collect();
        order.reverse();
        let state = RoundState::start(Shoe::from_cards(order), 0.01, "SOL".to_string(), None, 0);
        key.sign(&state).unwrap()
    }

    #[test]
    fn test_start_defaults() {
        let key = key();
        let response = handle(GameRequest::start(), &key).unwrap();
        let state = key.verify(&response.state_token).unwrap();
        assert_eq!(state.bet, DEFAULT_BET);
        assert_eq!(state.currency, DEFAULT_CURRENCY);
        assert_eq!(state.public_key, None);
        assert_eq!(state.player.len(), 2);
        assert_eq!(state.dealer.len(), 2);
        assert_eq!(response.view, View::project(&state));
        if state.status == Status::Playing {
            assert_eq!(response.view.dealer[1], DealerCard::FaceDown);
        }
    }

    #[test]
    fn test_start_with_options() {
        let key = key();
        let request = GameRequest {
            action: Some("start".to_string()),
            public_key: Some("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU".to_string()),
            currency: Some("USDC".to_string()),
            bet: Some(Value::from("2.5")),
            ..GameRequest::default()
        };
        let response = handle(request, &key).unwrap();
        let state = key.verify(&response.state_token).unwrap();
        assert_eq!(state.bet, 2.5);
        assert_eq!(state.currency, "USDC");
        assert_eq!(
            state.public_key.as_deref(),
            Some("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU")
        );
    }

    #[test]
    fn test_invalid_bets() {
        for bet in [Value::from("lots"), Value::Bool(true), serde_json::json!([1])] {
            let request = GameRequest {
                bet: Some(bet),
                ..GameRequest::start()
            };
            assert!(matches!(handle(request, &key()), Err(SessionError::InvalidBet)));
        }
    }

    #[test]
    fn test_missing_token() {
        for action in [Action::Hit, Action::Stand, Action::Double] {
            let mut request = GameRequest::action(action, "");
            assert!(matches!(handle(request.clone(), &key()), Err(SessionError::MissingToken)));
            request.state_token = None;
            assert!(matches!(handle(request, &key()), Err(SessionError::MissingToken)));
        }
    }

    #[test]
    fn test_unknown_action() {
        for action in [None, Some("split"), Some("surrender"), Some("")] {
            let request = GameRequest {
                action: action.map(str::to_string),
                state_token: Some("whatever".to_string()),
                ..GameRequest::default()
            };
            assert!(matches!(handle(request, &key()), Err(SessionError::UnknownAction)));
        }
    }

    #[test]
    fn test_unreadable_body() {
        assert_eq!(GameRequest::from_body(b"not json"), GameRequest::default());
        assert_eq!(GameRequest::from_body(b"[1, 2]"), GameRequest::default());
        assert_eq!(GameRequest::from_body(b"{\"action\": 5}"), GameRequest::default());
        let request = GameRequest::from_body(br#"{"action":"hit","stateToken":"abc","bet":1}"#);
        assert_eq!(request.action.as_deref(), Some("hit"));
        assert_eq!(request.state_token.as_deref(), Some("abc"));
        assert_eq!(request.bet, Some(Value::from(1)));
    }

    #[test]
    fn test_odd_field_types_keep_action() {
        let key = key();
        let token = rigged_token(&key, &["2♥", "3♣"], &["Q♠", "7♦"], &["4♠"]);
        let body = serde_json::json!({"action": "hit", "stateToken": token, "currency": 1});
        let request = GameRequest::from_body(&serde_json::to_vec(&body).unwrap());
        assert_eq!(request.currency.as_deref(), Some("1"));
        let response = handle(request, &key).unwrap();
        assert_eq!(response.view.player.len(), 3);
        assert_eq!(response.view.status, Status::Playing);

        let body = br#"{"action":"start","publicKey":12345,"currency":null}"#;
        let response = handle(GameRequest::from_body(body), &key).unwrap();
        let state = key.verify(&response.state_token).unwrap();
        assert_eq!(state.public_key.as_deref(), Some("12345"));
        assert_eq!(state.currency, DEFAULT_CURRENCY);
    }

    #[test]
    fn test_hit_to_bust_reveals_dealer() {
        let key = key();
        let mut token = rigged_token(&key, &["2♥", "3♣"], &["Q♠", "6♦"], &["4♠", "5♦", "6♣", "K♥"]);
        let mut view;
        loop {
            let response = handle(GameRequest::action(Action::Hit, token), &key).unwrap();
            token = response.state_token;
            view = response.view;
            if view.status != Status::Playing {
                break;
            }
            assert_eq!(view.dealer[1], DealerCard::FaceDown);
        }
        assert_eq!(view.status, Status::PlayerBust);
        assert!(view.reveal_dealer);
        assert_eq!(view.dealer[1], DealerCard::Up("6♦".parse().unwrap()));
    }

    #[test]
    fn test_double_reaches_terminal() {
        let key = key();
        let token = rigged_token(&key, &["5♥", "6♣"], &["10♠", "7♦"], &["9♠"]);
        let response = handle(GameRequest::action(Action::Double, token), &key).unwrap();
        assert_eq!(response.view.bet, 0.02);
        assert_eq!(response.view.player.len(), 3);
        assert_eq!(response.view.status, Status::PlayerWin);
        assert!(response.view.reveal_dealer);
    }

    #[test]
    fn test_late_double_is_a_hit() {
        let key = key();
        let token = rigged_token(&key, &["2♥", "3♣"], &["Q♠", "7♦"], &["4♠", "5♦"]);
        let token = handle(GameRequest::action(Action::Hit, token), &key)
            .unwrap()
            .state_token;
        let response = handle(GameRequest::action(Action::Double, token), &key).unwrap();
        assert_eq!(response.view.bet, 0.01);
        assert_eq!(response.view.player.len(), 4);
        assert_eq!(response.view.status, Status::Playing);
        assert!(!response.view.can_double);
    }

    #[test]
    fn test_finished_round_is_idempotent() {
        let key = key();
        let token = rigged_token(&key, &["10♥", "9♣"], &["10♠", "7♦"], &["2♠"]);
        let first = handle(GameRequest::action(Action::Stand, token), &key).unwrap();
        assert_eq!(first.view.status, Status::PlayerWin);

        for action in [Action::Hit, Action::Stand, Action::Double] {
            let again = handle(GameRequest::action(action, first.state_token.clone()), &key).unwrap();
            assert_eq!(again, first);
        }
    }

    #[test]
    fn test_tampered_token_rejected() {
        let key = key();
        let token = rigged_token(&key, &["10♥", "6♣"], &["10♠", "7♦"], &[]);
        let tampered = token.replace("\\\"doubled\\\":false", "\\\"doubled\\\":true");
        assert_ne!(tampered, token);
        let result = handle(GameRequest::action(Action::Stand, tampered), &key);
        assert!(matches!(result, Err(SessionError::InvalidSignature)));
    }
}
