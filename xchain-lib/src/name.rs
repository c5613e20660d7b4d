//! Parsed X.501 distinguished names.
//!
//! The verifier compares subjects and issuers structurally, so names are
//! modeled as an ordered sequence of relative distinguished names (RDNs),
//! each holding one or more attribute type/value pairs. Equality and hashing
//! over this model are what the certificate pool keys on.

use crate::oid;

/// A single attribute inside an RDN, e.g. `CN=example.com`.
///
/// The attribute type is kept as its dotted-decimal OID string; values are
/// the parsed string form of the underlying DER value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeTypeAndValue {
    pub oid: String,
    pub value: String,
}

/// A relative distinguished name: a set of attributes at one level of the
/// name hierarchy. Almost always a single attribute in practice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Rdn {
    pub attributes: Vec<AttributeTypeAndValue>,
}

/// An ordered sequence of RDNs, as it appears in a certificate's subject or
/// issuer field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DistinguishedName {
    pub rdns: Vec<Rdn>,
}

impl DistinguishedName {
    /// Build a name with one single-attribute RDN per `(oid, value)` pair,
    /// the layout produced by virtually every issuing tool.
    pub fn from_attributes<I, S>(attrs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        DistinguishedName {
            rdns: attrs
                .into_iter()
                .map(|(oid, value)| Rdn {
                    attributes: vec![AttributeTypeAndValue {
                        oid: oid.into(),
                        value: value.into(),
                    }],
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// All values of the given attribute type, in name order.
    pub fn attribute_values<'a>(&'a self, attr_oid: &'a str) -> impl Iterator<Item = &'a str> {
        self.rdns
            .iter()
            .flat_map(|rdn| rdn.attributes.iter())
            .filter(move |attr| attr.oid == attr_oid)
            .map(|attr| attr.value.as_str())
    }

    /// The first Common Name attribute, if any.
    pub fn common_name(&self) -> Option<&str> {
        self.attribute_values(oid::COMMON_NAME).next()
    }

    /// The first Organization attribute, if any.
    pub fn organization(&self) -> Option<&str> {
        self.attribute_values(oid::ORGANIZATION).next()
    }

    /// Whether `constraint` is an RDN-prefix of this name.
    ///
    /// Every attribute of every constraint RDN must be present with an equal
    /// value at the same position in this name; trailing RDNs beyond the
    /// constraint are allowed. A name that omits a required attribute does
    /// not match.
    pub fn has_rdn_prefix(&self, constraint: &DistinguishedName) -> bool {
        if constraint.rdns.len() > self.rdns.len() {
            return false;
        }
        constraint
            .rdns
            .iter()
            .zip(self.rdns.iter())
            .all(|(required, actual)| {
                required
                    .attributes
                    .iter()
                    .all(|attr| actual.attributes.contains(attr))
            })
    }

    /// Render as a one-line string, e.g. `C=US, O=Acme Co, CN=example.com`.
    pub fn to_oneline(&self) -> String {
        let mut out = String::new();
        for rdn in &self.rdns {
            for attr in &rdn.attributes {
                if !out.is_empty() {
                    out.push_str(", ");
                }
                match short_attr_name(&attr.oid) {
                    Some(short) => {
                        out.push_str(short);
                    }
                    None => out.push_str(&attr.oid),
                }
                out.push('=');
                out.push_str(&attr.value);
            }
        }
        out
    }
}

impl std::fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_oneline())
    }
}

/// Short display form for the well-known DN attribute types.
fn short_attr_name(attr_oid: &str) -> Option<&'static str> {
    Some(match attr_oid {
        oid::COMMON_NAME => "CN",
        oid::COUNTRY => "C",
        oid::LOCALITY => "L",
        oid::STATE_OR_PROVINCE => "ST",
        oid::STREET_ADDRESS => "street",
        oid::ORGANIZATION => "O",
        oid::ORGANIZATIONAL_UNIT => "OU",
        oid::POSTAL_CODE => "postalCode",
        oid::SERIAL_NUMBER => "serialNumber",
        oid::EMAIL_ADDRESS => "emailAddress",
        oid::DOMAIN_COMPONENT => "DC",
        _ => return None,
    })
}
