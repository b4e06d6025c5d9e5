// Copyright (c) 2021 DDN. All rights reserved.
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file.

pub mod req {
    use quick_xml::{
        events::{self, Event},
        Writer,
    };
    use std::io::Cursor;

    pub(crate) static XMLNS: &str = "http://www.netapp.com/filer/admin";

    type EVs<'a> = Vec<events::Event<'a>>;

    pub(crate) fn decl(mut xs: EVs) -> EVs {
        xs.insert(
            0,
            Event::Decl(events::BytesDecl::new(b"1.0", Some(b"utf-8"), None)),
        );

        xs
    }

    /// The netapp element is the root of every ONTAPI request document.
    /// It carries the protocol namespace and the negotiated API version.
    pub(crate) fn netapp<'a>(version: &'a str, mut xs: EVs<'a>) -> EVs<'a> {
        xs.insert(
            0,
            Event::Start(
                events::BytesStart::borrowed_name(b"netapp")
                    .with_attributes(vec![("xmlns", XMLNS), ("version", version)]),
            ),
        );

        xs.push(Event::End(events::BytesEnd::borrowed(b"netapp")));

        xs
    }

    /// A single named operation. The facts module only issues calls that
    /// take no parameters, so the element is always empty.
    pub(crate) fn api_call(name: &str) -> Event<'_> {
        Event::Empty(events::BytesStart::borrowed_name(name.as_bytes()))
    }

    pub(crate) fn evs_to_bytes(xs: EVs) -> Result<Vec<u8>, quick_xml::Error> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        for x in xs {
            writer.write_event(x)?;
        }

        Ok(writer.into_inner().into_inner())
    }

    /// Encode one parameterless ONTAPI call into a request body.
    pub fn encode_request(version: &str, op: &str) -> Result<Vec<u8>, quick_xml::Error> {
        evs_to_bytes(decl(netapp(version, vec![api_call(op)])))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_encode_request() {
            let xs = encode_request("1.21", "system-get-version").unwrap();

            assert_eq!(
                String::from_utf8_lossy(&xs),
                "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
                 <netapp xmlns=\"http://www.netapp.com/filer/admin\" version=\"1.21\">\
                 <system-get-version/>\
                 </netapp>"
            );
        }

        #[test]
        fn test_encode_iter_request() {
            let xs = encode_request("1.21", "aggr-get-iter").unwrap();

            assert!(String::from_utf8_lossy(&xs).contains("<aggr-get-iter/>"));
        }
    }
}

pub mod resp {
    use crate::OntapiClientError;
    use quick_xml::{
        events::{BytesStart, Event},
        Reader,
    };
    use std::collections::HashMap;

    /// The errno the vendor SDK reports local (non-API) failures under.
    pub static ECONNECTION: &str = "13001";

    /// One node of an ONTAPI response document: named children in document
    /// order, text content, and the element's attributes.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Element {
        name: String,
        text: String,
        attributes: HashMap<String, String>,
        children: Vec<Element>,
    }

    impl Element {
        pub fn name(&self) -> &str {
            &self.name
        }
        pub fn text(&self) -> &str {
            &self.text
        }
        pub fn attr(&self, name: &str) -> Option<&str> {
            self.attributes.get(name).map(String::as_str)
        }
        /// The first child with the given name.
        pub fn child_get(&self, name: &str) -> Option<&Element> {
            self.children.iter().find(|x| x.name == name)
        }
        /// The text content of the first child with the given name.
        pub fn child_get_string(&self, name: &str) -> Option<&str> {
            self.child_get(name).map(|x| x.text())
        }
        pub fn children_get(&self) -> &[Element] {
            &self.children
        }
    }

    fn element_from_start(
        x: &BytesStart<'_>,
        reader: &Reader<&[u8]>,
    ) -> Result<Element, OntapiClientError> {
        let name = std::str::from_utf8(x.name())?.to_string();

        let attributes = x.attributes().try_fold(HashMap::new(), |mut acc, a| {
            let a = a?;

            acc.insert(
                std::str::from_utf8(a.key)?.to_string(),
                a.unescape_and_decode_value(reader)?,
            );

            Ok::<_, OntapiClientError>(acc)
        })?;

        Ok(Element {
            name,
            attributes,
            ..Default::default()
        })
    }

    /// Parse a whole XML document into its root `Element`.
    pub fn parse_document(body: &str) -> Result<Element, OntapiClientError> {
        let mut reader = Reader::from_str(body);
        reader.trim_text(true);

        let mut buf = vec![];
        let mut stack: Vec<Element> = vec![];

        loop {
            match reader.read_event(&mut buf)? {
                Event::Start(x) => {
                    let el = element_from_start(&x, &reader)?;

                    stack.push(el);
                }
                Event::Empty(x) => {
                    let el = element_from_start(&x, &reader)?;

                    match stack.last_mut() {
                        Some(parent) => parent.children.push(el),
                        None => return Ok(el),
                    }
                }
                Event::Text(x) => {
                    if let Some(el) = stack.last_mut() {
                        el.text.push_str(&x.unescape_and_decode(&reader)?);
                    }
                }
                Event::End(_) => {
                    let el = stack.pop().ok_or_else(|| {
                        OntapiClientError::MalformedResponse("unbalanced end tag".into())
                    })?;

                    match stack.last_mut() {
                        Some(parent) => parent.children.push(el),
                        None => return Ok(el),
                    }
                }
                Event::Eof => {
                    return Err(OntapiClientError::MalformedResponse(
                        "unexpected end of document".into(),
                    ))
                }
                _ => {}
            }

            buf.clear();
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Status {
        Passed,
        Failed,
    }

    /// The outcome of one remote call: the inline status of the `results`
    /// element, the vendor errno and reason on failure, and the response
    /// tree on success.
    #[derive(Debug, Clone, PartialEq)]
    pub struct CallResult {
        status: Status,
        errno: Option<String>,
        reason: Option<String>,
        tree: Element,
    }

    impl CallResult {
        /// A failure that never reached the API, reported on the same
        /// channel the vendor SDK uses.
        pub fn local_failure(reason: impl Into<String>) -> Self {
            Self {
                status: Status::Failed,
                errno: Some(ECONNECTION.to_string()),
                reason: Some(reason.into()),
                tree: Element {
                    name: "results".to_string(),
                    ..Default::default()
                },
            }
        }

        pub fn status(&self) -> Status {
            self.status
        }
        pub fn is_failed(&self) -> bool {
            self.status == Status::Failed
        }
        pub fn errno(&self) -> Option<&str> {
            self.errno.as_deref()
        }
        pub fn reason(&self) -> Option<&str> {
            self.reason.as_deref()
        }
        pub fn tree(&self) -> &Element {
            &self.tree
        }

        /// The response tree on success, or the vendor errno and reason as
        /// an error.
        pub fn into_result(self) -> Result<Element, OntapiClientError> {
            match self.status {
                Status::Passed => Ok(self.tree),
                Status::Failed => Err(OntapiClientError::Api {
                    errno: self.errno.unwrap_or_default(),
                    reason: self.reason.unwrap_or_default(),
                }),
            }
        }
    }

    /// Parse one ONTAPI response document down to its `results` element.
    pub fn parse_call(body: &str) -> Result<CallResult, OntapiClientError> {
        let root = parse_document(body)?;

        let results = if root.name == "results" {
            root
        } else {
            root.children
                .into_iter()
                .find(|x| x.name == "results")
                .ok_or_else(|| {
                    OntapiClientError::MalformedResponse("no results element".into())
                })?
        };

        let status = match results.attributes.get("status").map(String::as_str) {
            Some("passed") => Status::Passed,
            Some("failed") => Status::Failed,
            Some(other) => {
                return Err(OntapiClientError::MalformedResponse(format!(
                    "unknown results status: {}",
                    other
                )))
            }
            None => {
                return Err(OntapiClientError::MalformedResponse(
                    "results element has no status".into(),
                ))
            }
        };

        let errno = results.attributes.get("errno").cloned();
        let reason = results.attributes.get("reason").cloned();

        Ok(CallResult {
            status,
            errno,
            reason,
            tree: results,
        })
    }

}
