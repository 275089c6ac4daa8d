#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    strum_macros::Display,
    strum_macros::IntoStaticStr,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Keyword {
    And,
    As,
    Conflict,
    Constraint,
    Delete,
    Do,
    False,
    From,
    Insert,
    Into,
    Is,
    Not,
    Nothing,
    Null,
    On,
    Or,
    Select,
    Set,
    True,
    Update,
    Upsert,
    Values,
    Where,
    Xor,
}

use Keyword::*;

const ALL: &[Keyword] = &[
    And, As, Conflict, Constraint, Delete, Do, False, From, Insert, Into, Is, Not, Nothing, Null,
    On, Or, Select, Set, True, Update, Upsert, Values, Where, Xor,
];

impl Keyword {
    pub fn lookup(word: &str) -> Option<Keyword> {
        ALL.iter()
            .copied()
            .find(|kw| <&'static str>::from(*kw).eq_ignore_ascii_case(word))
    }
}

// Every keyword of the grammar is reserved: none of them can name a
// table, a column or a function.
pub fn is_reserved_word(word: &str) -> bool {
    Keyword::lookup(word).is_some()
}

#[test]
fn test_lookup() {
    assert_eq!(Keyword::lookup("insert"), Some(Keyword::Insert));
    assert_eq!(Keyword::lookup("UpSeRt"), Some(Keyword::Upsert));
    assert_eq!(Keyword::lookup("product"), None);
    assert_eq!(<&'static str>::from(Keyword::Conflict), "CONFLICT");
    assert!(is_reserved_word("select"));
}
