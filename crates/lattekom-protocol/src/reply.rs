//! Server replies and Protocol A error codes.

use std::fmt;

use crate::token::Token;

/// Error codes a server sends with a failed reply.
///
/// Codes missing from the table are kept as [`ErrorCode::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoError,
    NotImplemented,
    ObsoleteCall,
    InvalidPassword,
    StringTooLong,
    LoginFirst,
    LoginDisallowed,
    ConferenceZero,
    UndefinedConference,
    UndefinedPerson,
    AccessDenied,
    PermissionDenied,
    NotMember,
    NoSuchText,
    TextZero,
    NoSuchLocalText,
    LocalTextZero,
    BadName,
    IndexOutOfRange,
    ConferenceExists,
    PersonExists,
    SecretPublic,
    Letterbox,
    LdbError,
    IllegalMisc,
    IllegalInfoType,
    AlreadyRecipient,
    AlreadyComment,
    AlreadyFootnote,
    NotRecipient,
    NotComment,
    NotFootnote,
    RecipientLimit,
    CommentLimit,
    FootnoteLimit,
    MarkLimit,
    NotAuthor,
    NoConnect,
    OutOfMemory,
    ServerIsCrazy,
    ClientIsCrazy,
    UndefinedSession,
    RegexpError,
    NotMarked,
    TemporaryFailure,
    LongArray,
    AnonymousRejected,
    IllegalAuxItem,
    AuxItemPermission,
    UnknownAsync,
    InternalError,
    FeatureDisabled,
    MessageNotSent,
    InvalidMembershipType,
    InvalidRange,
    InvalidRangeList,
    UndefinedMeasurement,
    PriorityDenied,
    WeightDenied,
    WeightZero,
    BadBool,
    Other(i64),
}

impl ErrorCode {
    /// Maps a wire error code to its variant.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::NoError,
            2 => Self::NotImplemented,
            3 => Self::ObsoleteCall,
            4 => Self::InvalidPassword,
            5 => Self::StringTooLong,
            6 => Self::LoginFirst,
            7 => Self::LoginDisallowed,
            8 => Self::ConferenceZero,
            9 => Self::UndefinedConference,
            10 => Self::UndefinedPerson,
            11 => Self::AccessDenied,
            12 => Self::PermissionDenied,
            13 => Self::NotMember,
            14 => Self::NoSuchText,
            15 => Self::TextZero,
            16 => Self::NoSuchLocalText,
            17 => Self::LocalTextZero,
            18 => Self::BadName,
            19 => Self::IndexOutOfRange,
            20 => Self::ConferenceExists,
            21 => Self::PersonExists,
            22 => Self::SecretPublic,
            23 => Self::Letterbox,
            24 => Self::LdbError,
            25 => Self::IllegalMisc,
            26 => Self::IllegalInfoType,
            27 => Self::AlreadyRecipient,
            28 => Self::AlreadyComment,
            29 => Self::AlreadyFootnote,
            30 => Self::NotRecipient,
            31 => Self::NotComment,
            32 => Self::NotFootnote,
            33 => Self::RecipientLimit,
            34 => Self::CommentLimit,
            35 => Self::FootnoteLimit,
            36 => Self::MarkLimit,
            37 => Self::NotAuthor,
            38 => Self::NoConnect,
            39 => Self::OutOfMemory,
            40 => Self::ServerIsCrazy,
            41 => Self::ClientIsCrazy,
            42 => Self::UndefinedSession,
            43 => Self::RegexpError,
            44 => Self::NotMarked,
            45 => Self::TemporaryFailure,
            46 => Self::LongArray,
            47 => Self::AnonymousRejected,
            48 => Self::IllegalAuxItem,
            49 => Self::AuxItemPermission,
            50 => Self::UnknownAsync,
            51 => Self::InternalError,
            52 => Self::FeatureDisabled,
            53 => Self::MessageNotSent,
            54 => Self::InvalidMembershipType,
            55 => Self::InvalidRange,
            56 => Self::InvalidRangeList,
            57 => Self::UndefinedMeasurement,
            58 => Self::PriorityDenied,
            59 => Self::WeightDenied,
            60 => Self::WeightZero,
            61 => Self::BadBool,
            other => Self::Other(other),
        }
    }

    /// Numeric wire value.
    pub fn code(&self) -> i64 {
        match self {
            Self::NoError => 0,
            Self::NotImplemented => 2,
            Self::ObsoleteCall => 3,
            Self::InvalidPassword => 4,
            Self::StringTooLong => 5,
            Self::LoginFirst => 6,
            Self::LoginDisallowed => 7,
            Self::ConferenceZero => 8,
            Self::UndefinedConference => 9,
            Self::UndefinedPerson => 10,
            Self::AccessDenied => 11,
            Self::PermissionDenied => 12,
            Self::NotMember => 13,
            Self::NoSuchText => 14,
            Self::TextZero => 15,
            Self::NoSuchLocalText => 16,
            Self::LocalTextZero => 17,
            Self::BadName => 18,
            Self::IndexOutOfRange => 19,
            Self::ConferenceExists => 20,
            Self::PersonExists => 21,
            Self::SecretPublic => 22,
            Self::Letterbox => 23,
            Self::LdbError => 24,
            Self::IllegalMisc => 25,
            Self::IllegalInfoType => 26,
            Self::AlreadyRecipient => 27,
            Self::AlreadyComment => 28,
            Self::AlreadyFootnote => 29,
            Self::NotRecipient => 30,
            Self::NotComment => 31,
            Self::NotFootnote => 32,
            Self::RecipientLimit => 33,
            Self::CommentLimit => 34,
            Self::FootnoteLimit => 35,
            Self::MarkLimit => 36,
            Self::NotAuthor => 37,
            Self::NoConnect => 38,
            Self::OutOfMemory => 39,
            Self::ServerIsCrazy => 40,
            Self::ClientIsCrazy => 41,
            Self::UndefinedSession => 42,
            Self::RegexpError => 43,
            Self::NotMarked => 44,
            Self::TemporaryFailure => 45,
            Self::LongArray => 46,
            Self::AnonymousRejected => 47,
            Self::IllegalAuxItem => 48,
            Self::AuxItemPermission => 49,
            Self::UnknownAsync => 50,
            Self::InternalError => 51,
            Self::FeatureDisabled => 52,
            Self::MessageNotSent => 53,
            Self::InvalidMembershipType => 54,
            Self::InvalidRange => 55,
            Self::InvalidRangeList => 56,
            Self::UndefinedMeasurement => 57,
            Self::PriorityDenied => 58,
            Self::WeightDenied => 59,
            Self::WeightZero => 60,
            Self::BadBool => 61,
            Self::Other(code) => *code,
        }
    }

    /// Protocol name of the error, e.g. `no-such-text`.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NoError => "no-error",
            Self::NotImplemented => "not-implemented",
            Self::ObsoleteCall => "obsolete-call",
            Self::InvalidPassword => "invalid-password",
            Self::StringTooLong => "string-too-long",
            Self::LoginFirst => "login-first",
            Self::LoginDisallowed => "login-disallowed",
            Self::ConferenceZero => "conference-zero",
            Self::UndefinedConference => "undefined-conference",
            Self::UndefinedPerson => "undefined-person",
            Self::AccessDenied => "access-denied",
            Self::PermissionDenied => "permission-denied",
            Self::NotMember => "not-member",
            Self::NoSuchText => "no-such-text",
            Self::TextZero => "text-zero",
            Self::NoSuchLocalText => "no-such-local-text",
            Self::LocalTextZero => "local-text-zero",
            Self::BadName => "bad-name",
            Self::IndexOutOfRange => "index-out-of-range",
            Self::ConferenceExists => "conference-exists",
            Self::PersonExists => "person-exists",
            Self::SecretPublic => "secret-public",
            Self::Letterbox => "letterbox",
            Self::LdbError => "ldb-error",
            Self::IllegalMisc => "illegal-misc",
            Self::IllegalInfoType => "illegal-info-type",
            Self::AlreadyRecipient => "already-recipient",
            Self::AlreadyComment => "already-comment",
            Self::AlreadyFootnote => "already-footnote",
            Self::NotRecipient => "not-recipient",
            Self::NotComment => "not-comment",
            Self::NotFootnote => "not-footnote",
            Self::RecipientLimit => "recipient-limit",
            Self::CommentLimit => "comment-limit",
            Self::FootnoteLimit => "footnote-limit",
            Self::MarkLimit => "mark-limit",
            Self::NotAuthor => "not-author",
            Self::NoConnect => "no-connect",
            Self::OutOfMemory => "out-of-memory",
            Self::ServerIsCrazy => "server-is-crazy",
            Self::ClientIsCrazy => "client-is-crazy",
            Self::UndefinedSession => "undefined-session",
            Self::RegexpError => "regexp-error",
            Self::NotMarked => "not-marked",
            Self::TemporaryFailure => "temporary-failure",
            Self::LongArray => "long-array",
            Self::AnonymousRejected => "anonymous-rejected",
            Self::IllegalAuxItem => "illegal-aux-item",
            Self::AuxItemPermission => "aux-item-permission",
            Self::UnknownAsync => "unknown-async",
            Self::InternalError => "internal-error",
            Self::FeatureDisabled => "feature-disabled",
            Self::MessageNotSent => "message-not-sent",
            Self::InvalidMembershipType => "invalid-membership-type",
            Self::InvalidRange => "invalid-range",
            Self::InvalidRangeList => "invalid-range-list",
            Self::UndefinedMeasurement => "undefined-measurement",
            Self::PriorityDenied => "priority-denied",
            Self::WeightDenied => "weight-denied",
            Self::WeightZero => "weight-zero",
            Self::BadBool => "bad-bool",
            Self::Other(_) => "unknown-error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

/// The server's answer to one call.
///
/// A failed reply carries the error code as its first parameter and the
/// error status (which object the error refers to) as the second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcReply {
    /// Id of the call this answers.
    pub id: u32,
    /// Whether the server accepted the call.
    pub success: bool,
    /// Returned tokens, in wire order.
    pub parameters: Vec<Token>,
}

impl RpcReply {
    /// A successful reply carrying `parameters`.
    pub fn success(id: u32, parameters: Vec<Token>) -> Self {
        Self {
            id,
            success: true,
            parameters,
        }
    }

    /// A failed reply with `error_code` and `error_status`.
    pub fn failure(id: u32, error_code: i64, error_status: i64) -> Self {
        Self {
            id,
            success: false,
            parameters: vec![Token::Integer(error_code), Token::Integer(error_status)],
        }
    }

    /// Raw error code of a failed reply.
    ///
    /// `None` for successful replies and for failures whose first parameter
    /// is missing or not an integer.
    pub fn error_code(&self) -> Option<i64> {
        if self.success {
            return None;
        }
        self.parameters.first().and_then(Token::as_integer)
    }

    /// Decoded error code of a failed reply.
    pub fn error(&self) -> Option<ErrorCode> {
        self.error_code().map(ErrorCode::from_code)
    }

    /// Error status of a failed reply.
    pub fn error_status(&self) -> Option<i64> {
        if self.success {
            return None;
        }
        self.parameters.get(1).and_then(Token::as_integer)
    }
}
