use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableRef<'a> {
    pub schema: Option<&'a str>,
    pub table: &'a str,
}

impl<'a> Display for TableRef<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(schema) = self.schema {
            write!(f, "{}.{}", schema, self.table)
        } else {
            write!(f, "{}", self.table)
        }
    }
}

#[test]
fn test_table_ref_display() {
    let table = TableRef {
        schema: Some("public"),
        table: "product",
    };
    assert_eq!(table.to_string(), "public.product");
}
