//! Contract records shared between the API and its callers.
//!
//! # Design
//! Field names follow the JSON wire format (`camelCase`). Relations such as
//! a wallet's transactions are optional and flattened onto the base record,
//! so `WalletResponse` decodes from the same object a bare `Wallet` does.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Network;

/// The API's standard response envelope.
///
/// `success` is a business outcome and is independent of the transport
/// status code; `status` need not match the HTTP status either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseBody<T> {
    pub status: i32,
    pub message: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ResponseBody<T> {
    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetType {
    Native,
    Token,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenStandard {
    #[serde(rename = "ERC20")]
    Erc20,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Send,
    Receive,
    Contract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// An ERC-20 transfer decoded from a transaction's logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    pub id: String,
    pub transaction_id: String,
    pub tx_hash: String,
    pub token_address: String,
    pub symbol: String,
    pub decimals: u8,
    pub standard: TokenStandard,
    /// Amount in base units, as a decimal string.
    pub amount_raw: String,
    pub formatted_amount: String,
    pub from_address: String,
    pub to_address: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub id: String,
    pub transaction_id: String,
    pub tx_hash: String,
    #[serde(default)]
    pub gas_used: Option<String>,
    #[serde(default)]
    pub effective_gas_price: Option<String>,
    #[serde(default)]
    pub fee_paid: Option<String>,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub nonce: Option<u64>,
    #[serde(default)]
    pub error_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub wallet_id: String,
    pub chain_id: u64,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub asset_type: AssetType,
    pub from_address: String,
    #[serde(default)]
    pub to_address: Option<String>,
    #[serde(default)]
    pub value_raw: Option<String>,
    #[serde(default)]
    pub value_formatted: Option<String>,
    pub status: TransactionStatus,
    #[serde(default)]
    pub block_number: Option<u64>,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: String,
    pub user_id: String,
    pub chain_id: u64,
    pub blockchain: String,
    #[serde(default)]
    pub label: Option<String>,
    pub address: String,
    pub is_default: bool,
    pub balance: String,
    pub encrypted_mnemonic: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user record as stored by the API.
///
/// `password` holds the stored hash. It is accepted on input and never
/// written back out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub role: String,
    pub is_verified: bool,
    pub is_active: bool,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    #[serde(flatten)]
    pub transaction: Transaction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<TransactionReceipt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfers: Option<Vec<TokenTransfer>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    #[serde(flatten)]
    pub wallet: Wallet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<TransactionResponse>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(flatten)]
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallets: Option<Vec<WalletResponse>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub symbol: String,
    pub balance: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeBalance {
    #[serde(flatten)]
    pub balance: WalletBalance,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    #[serde(flatten)]
    pub balance: WalletBalance,
    pub kind: String,
}

/// Balance endpoint payload: the native coin alone, or a list of tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BalanceResponse {
    Native(NativeBalance),
    Tokens(Vec<TokenBalance>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthContextState {
    Guest,
    Authorized,
    Unauthorized,
    Login,
    Register,
    VerifyOtp,
    ResendOtp,
    Logout,
}

impl AuthContextState {
    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthContextState::Authorized)
    }
}

/// Why a one-time password was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Purpose {
    #[default]
    None,
    Login,
    Register,
    Transfer,
    Swap,
    ResetPassword,
    ChangePassword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateResponse {
    pub state: AuthContextState,
    pub purpose: Purpose,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub state: AuthContextState,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remember_me: Option<bool>,
    pub purpose: Purpose,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginForm {
    #[serde(rename = "emailOrusername")]
    pub email_or_username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remember_me: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOtpForm {
    pub purpose: Purpose,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOtpForm {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCheckForm {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetPasswordForm {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateWalletForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub network: Network,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportWalletForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub phrase: String,
    pub network: Network,
}
