use std::cmp::Ordering;

/// Declared column type. `Varchar`/`Char` carry the declared size in characters.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SqlType {
    Int,
    Varchar(u32),
    Char(u32),
    Float,
    Bool,
}

impl SqlType {
    /// True if a value of `other` may be stored in a column declared as `self`,
    /// per the numeric/numeric, string/string, bool/bool compatibility rule.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (SqlType::Int, Value::Int(_)) => true,
            (SqlType::Float, Value::Int(_) | Value::Float(_)) => true,
            (SqlType::Varchar(n) | SqlType::Char(n), Value::Text(s)) => {
                s.chars().count() as u32 <= *n
            }
            (SqlType::Bool, Value::Bool(_)) => true,
            _ => false,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, SqlType::Int | SqlType::Float)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, SqlType::Varchar(_) | SqlType::Char(_))
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// "Truthy" semantics for AND/OR per the dialect's loose boolean coercion:
    /// a bool is itself, a non-zero int is true, a non-empty string is true,
    /// everything else (including NULL) is false.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Null => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "INT",
            Value::Float(_) => "FLOAT",
            Value::Text(_) => "TEXT",
            Value::Bool(_) => "BOOL",
            Value::Null => "NULL",
        }
    }

    /// Numeric/numeric and string/string cross-type comparison; NULL never compares.
    pub fn cmp_same_type(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// NULL compares unequal to everything, including another NULL.
    pub fn eq_same_type(&self, other: &Value) -> Option<bool> {
        if self.is_null() || other.is_null() {
            return Some(false);
        }
        self.cmp_same_type(other).map(|o| o == Ordering::Equal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cmp::Ordering::{Equal, Greater, Less};

    #[test]
    fn cmp_same_type_works() {
        assert_eq!(Value::Int(1).cmp_same_type(&Value::Int(2)), Some(Less));
        assert_eq!(Value::Int(1).cmp_same_type(&Value::Text("1".into())), None);
    }

    #[test]
    fn truthiness_matches_loose_coercion() {
        assert!(Value::Bool(true).truthy());
        assert!(!Value::Bool(false).truthy());
        assert!(Value::Int(1).truthy());
        assert!(!Value::Int(0).truthy());
        assert!(Value::Text("x".into()).truthy());
        assert!(!Value::Text("".into()).truthy());
        assert!(!Value::Null.truthy());
    }

    #[test]
    fn null_never_equals_null() {
        assert_eq!(Value::Null.eq_same_type(&Value::Null), Some(false));
        assert_eq!(Value::Null.eq_same_type(&Value::Int(1)), Some(false));
    }

    #[test]
    fn int_float_cross_compare() {
        assert_eq!(Value::Int(2).cmp_same_type(&Value::Float(2.0)), Some(Equal));
        assert_eq!(Value::Int(1).cmp_same_type(&Value::Float(2.0)), Some(Less));
    }

    #[test]
    fn sql_type_accepts_matches_declared_size() {
        assert!(SqlType::Varchar(3).accepts(&Value::Text("abc".into())));
        assert!(!SqlType::Varchar(2).accepts(&Value::Text("abc".into())));
        assert!(SqlType::Int.accepts(&Value::Null));
        assert!(!SqlType::Int.accepts(&Value::Text("1".into())));
        assert!(SqlType::Float.accepts(&Value::Int(3)));
    }

    #[test]
    fn comparisons_require_same_type() {
        assert_eq!(Value::Int(1).cmp_same_type(&Value::Int(2)), Some(Less));
        assert_eq!(
            Value::Text("a".into()).cmp_same_type(&Value::Text("a".into())),
            Some(Equal)
        );
        assert_eq!(
            Value::Bool(true).cmp_same_type(&Value::Bool(false)),
            Some(Greater)
        );
        assert_eq!(Value::Int(1).cmp_same_type(&Value::Text("1".into())), None);
        assert_eq!(Value::Null.cmp_same_type(&Value::Int(1)), None);
    }

    #[test]
    fn serde_round_trip_stability() {
        let vals = vec![
            Value::Int(-42),
            Value::Float(1.5),
            Value::Text("Ada".into()),
            Value::Bool(true),
            Value::Null,
        ];

        let json = serde_json::to_string(&vals).unwrap();
        let back: Vec<Value> = serde_json::from_str(&json).unwrap();

        assert_eq!(vals, back);
    }

    proptest! {
        #[test]
        fn order_is_antisymmetric(i in any::<i64>(), j in any::<i64>()) {
            let a = Value::Int(i);
            let b = Value::Int(j);
            let ord1 = a.cmp_same_type(&b);
            let ord2 = b.cmp_same_type(&a);
            match (ord1, ord2) {
                (Some(o1), Some(o2)) => assert_eq!(o1, o2.reverse()),
                _ => prop_assert!(true),
            }
        }

        #[test]
        fn eq_reflexive(val in any::<i64>()) {
            let v = Value::Int(val);
            assert_eq!(v.eq_same_type(&v), Some(true));
        }

        #[test]
        fn text_cmp_matches_std(a in ".*", b in ".*") {
            let va = Value::Text(a.clone());
            let vb = Value::Text(b.clone());
            assert_eq!(va.cmp_same_type(&vb), Some(a.cmp(&b)));
        }
    }
}
