// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The link write path.

use linkage_document::{DocumentError, ObjectId, Workspace};
use linkage_property::{LinkSub, PropertyKind};

use crate::bindings::{LinkRole, LinkedObjectProperty};
use crate::element::LinkElement;
use crate::extension::LinkExtension;
use crate::sync::mirror;

fn link_extension(
    ws: &Workspace,
    link: ObjectId,
) -> Result<std::rc::Rc<LinkExtension>, DocumentError> {
    ws.extension::<LinkExtension>(link)
        .ok_or_else(|| LinkRole::LinkedObject.unconfigured())
}

fn owner_of(ws: &Workspace, element: &LinkElement, id: ObjectId) -> Result<ObjectId, DocumentError> {
    element
        .owner()
        .filter(|o| ws.is_attached(*o))
        .ok_or(DocumentError::OrphanElement(id))
}

/// Points `link` at `target`, optionally at the sub-object `subname` inside
/// it, and records `sub_elements`.
///
/// Array elements are never stored as targets: an element passed as `target`
/// is replaced by its owner with an index-qualified path (or, without a path,
/// by whatever the owner links to), and a path that ends at an element is
/// rewritten to end at the element's index.
///
/// Everything is validated before anything is written. Fails if:
///
/// - `link` has no link extension or no `LinkedObject` property bound, or
///   `sub_elements` is non-empty and no `SubElements` property is bound;
/// - an element involved has lost its owner;
/// - `target` is not attached;
/// - `target` is in another document and the link property is not external;
/// - `subname` does not resolve, or is given for a plain link property.
pub fn set_link(
    ws: &mut Workspace,
    link: ObjectId,
    target: ObjectId,
    subname: &str,
    sub_elements: Vec<String>,
) -> Result<(), DocumentError> {
    let ext = link_extension(ws, link)?;
    let bindings = ext.bindings();
    let property = bindings
        .linked_object()
        .ok_or_else(|| LinkRole::LinkedObject.unconfigured())?;
    let sub_elements_property = bindings.sub_elements();
    if !sub_elements.is_empty() && sub_elements_property.is_none() {
        return Err(LinkRole::SubElements.unconfigured());
    }

    let mut subname = subname.to_owned();
    if !subname.is_empty() && !subname.ends_with('.') {
        subname.push('.');
    }

    let mut target = target;
    let mut depth = ws.link_depth();
    while let Some(element) = ws.extension::<LinkElement>(target) {
        let owner = owner_of(ws, &element, target)?;
        if subname.is_empty() {
            depth = depth.next()?;
            target = ws
                .linked_object_with(owner, false, None, false, depth)?
                .ok_or(DocumentError::NotAttached(owner))?;
            continue;
        }
        subname = format!("{}.{subname}", element.index());
        target = owner;
        break;
    }

    if !ws.is_attached(target) {
        return Err(DocumentError::NotAttached(target));
    }
    let external = matches!(
        ws.registry().kind(property.id()),
        Some(PropertyKind::Link(options)) if options.is_external()
    );
    if !external && ws.document_of(target) != ws.document_of(link) {
        return Err(DocumentError::ExternalLink {
            object: link,
            target,
        });
    }

    if !subname.is_empty() {
        let found =
            ws.get_sub_object(target, &subname)?
                .ok_or_else(|| DocumentError::SubObjectNotFound {
                    object: target,
                    subname: subname.clone(),
                })?;
        if let Some(element) = ws.extension::<LinkElement>(found) {
            owner_of(ws, &element, found)?;
            let trimmed = &subname[..subname.len() - 1];
            let prefix = trimmed.rfind('.').map_or("", |dot| &trimmed[..=dot]);
            subname = format!("{prefix}{}.", element.index());
        }
        if matches!(property, LinkedObjectProperty::Plain(_)) {
            return Err(DocumentError::PropertyType {
                property: ws.registry().name(property.id()).unwrap_or_default(),
                expected: "a link with a sub-object path",
            });
        }
    }

    if let Some(list) = sub_elements_property
        && !sub_elements.is_empty()
    {
        mirror(ws, link, list, sub_elements.clone())?;
    }
    tracing::trace!(
        link = ws.name(link).unwrap_or_default(),
        target = ws.name(target).unwrap_or_default(),
        subname = %subname,
        "set link"
    );
    match property {
        LinkedObjectProperty::Plain(p) => ws.assign_property(link, p, Some(target)),
        LinkedObjectProperty::Sub(p) => ws.assign_property(
            link,
            p,
            LinkSub::new(target)
                .with_subname(subname)
                .with_sub_elements(sub_elements),
        ),
    }
}

/// Resets the link target of `link`.
pub fn clear_link(ws: &mut Workspace, link: ObjectId) -> Result<(), DocumentError> {
    let ext = link_extension(ws, link)?;
    match ext.bindings().linked_object() {
        Some(LinkedObjectProperty::Plain(p)) => ws.assign_property(link, p, None),
        Some(LinkedObjectProperty::Sub(p)) => ws.assign_property(link, p, LinkSub::default()),
        None => Err(LinkRole::LinkedObject.unconfigured()),
    }
}

#[cfg(test)]
mod tests {
    use linkage_document::ObjectSpec;
    use linkage_property::{LinkOptions, Property, PropertyMetadataBuilder};

    use super::*;
    use crate::bindings::LinkBindings;
    use crate::properties::LinkProperties;

    struct Fixture {
        ws: Workspace,
        props: LinkProperties,
        group: Property<Vec<ObjectId>>,
        doc: linkage_document::DocumentId,
    }

    fn fixture() -> Fixture {
        let mut ws = Workspace::new();
        let props = LinkProperties::install(&mut ws).unwrap();
        let group = ws.registry_mut().register_link(
            "Group",
            PropertyMetadataBuilder::new(Vec::new()).build(),
            LinkOptions::LOCAL,
        );
        let doc = ws.new_document("Doc");
        Fixture {
            ws,
            props,
            group,
            doc,
        }
    }

    #[test]
    fn sets_target_and_path() {
        let Fixture {
            mut ws,
            props,
            group,
            doc,
        } = fixture();
        let pad = ws.add_object(doc, ObjectSpec::new("Pad"), "Pad").unwrap();
        let body = ws
            .add_object(doc, ObjectSpec::new("Body").property_value(group, vec![pad]), "Body")
            .unwrap();
        let link = ws.add_object(doc, props.link_spec(), "Link").unwrap();

        set_link(&mut ws, link, body, "Pad", vec!["Face1".into()]).unwrap();
        let stored = ws.property(link, props.linked_object).unwrap();
        assert_eq!(stored.object, Some(body));
        assert_eq!(stored.subname, "Pad.");
        assert_eq!(
            ws.property(link, props.sub_elements),
            Some(&vec![String::from("Face1")])
        );
        assert_eq!(ws.linked_object(link, true).unwrap(), Some(pad));

        clear_link(&mut ws, link).unwrap();
        assert_eq!(
            ws.property(link, props.linked_object),
            Some(&LinkSub::default())
        );
    }

    #[test]
    fn validation_happens_before_writing() {
        let Fixture {
            mut ws, props, doc, ..
        } = fixture();
        let body = ws.add_object(doc, ObjectSpec::new("Body"), "Body").unwrap();
        let link = ws.add_object(doc, props.link_spec(), "Link").unwrap();

        let err = set_link(&mut ws, link, body, "Missing", Vec::new()).unwrap_err();
        assert_eq!(
            err,
            DocumentError::SubObjectNotFound {
                object: body,
                subname: "Missing.".into(),
            }
        );
        assert!(err.is_configuration());
        assert_eq!(
            ws.property(link, props.linked_object),
            Some(&LinkSub::default())
        );

        ws.remove_object(body).unwrap();
        assert_eq!(
            set_link(&mut ws, link, body, "", Vec::new()),
            Err(DocumentError::NotAttached(body))
        );
    }

    #[test]
    fn plain_links_stay_in_their_document() {
        let Fixture {
            mut ws, props, doc, ..
        } = fixture();
        let plain: Property<Option<ObjectId>> = ws.registry_mut().register_link(
            "Target",
            PropertyMetadataBuilder::new(None).build(),
            LinkOptions::LOCAL,
        );
        let bindings = LinkBindings::new()
            .bind(ws.registry(), LinkRole::LinkedObject, plain.id())
            .unwrap();
        let link = ws
            .add_object(
                doc,
                ObjectSpec::new("Link")
                    .property(plain)
                    .extension(LinkExtension::new(bindings)),
                "Link",
            )
            .unwrap();
        let local = ws.add_object(doc, ObjectSpec::new("Box"), "Box").unwrap();
        let other_doc = ws.new_document("Other");
        let remote = ws.add_object(other_doc, ObjectSpec::new("Box"), "Box").unwrap();

        assert_eq!(
            set_link(&mut ws, link, remote, "", Vec::new()),
            Err(DocumentError::ExternalLink {
                object: link,
                target: remote,
            })
        );
        assert!(
            set_link(&mut ws, link, local, "", vec!["Edge1".into()])
                .unwrap_err()
                .is_configuration()
        );
        set_link(&mut ws, link, local, "", Vec::new()).unwrap();
        assert_eq!(ws.property(link, plain), Some(&Some(local)));

        let full = ws.add_object(doc, props.link_spec(), "Full").unwrap();
        set_link(&mut ws, full, remote, "", Vec::new()).unwrap();
        assert_eq!(ws.linked_object(full, false).unwrap(), Some(remote));
    }

    #[test]
    fn elements_are_stored_through_their_owner() {
        let Fixture {
            mut ws,
            props,
            group,
            doc,
        } = fixture();
        let pad = ws.add_object(doc, ObjectSpec::new("Pad"), "Pad").unwrap();
        let part = ws
            .add_object(doc, ObjectSpec::new("Part").property_value(group, vec![pad]), "Part")
            .unwrap();
        let array = ws.add_object(doc, props.link_spec(), "Array").unwrap();
        set_link(&mut ws, array, part, "", Vec::new()).unwrap();
        ws.set_property(array, props.element_count, 3).unwrap();
        let elements = ws.property(array, props.element_list).unwrap().clone();
        let holder = ws
            .add_object(doc, ObjectSpec::new("Holder").property_value(group, vec![array]), "Holder")
            .unwrap();

        let by_element = ws.add_object(doc, props.link_spec(), "ByElement").unwrap();
        set_link(&mut ws, by_element, elements[2], "Pad", Vec::new()).unwrap();
        let stored = ws.property(by_element, props.linked_object).unwrap();
        assert_eq!((stored.object, stored.subname.as_str()), (Some(array), "2.Pad."));
        assert_eq!(ws.linked_object(by_element, true).unwrap(), Some(pad));

        // An expanded array stands in for itself, so a bare element resolves to it.
        set_link(&mut ws, by_element, elements[1], "", Vec::new()).unwrap();
        let stored = ws.property(by_element, props.linked_object).unwrap();
        assert_eq!((stored.object, stored.subname.as_str()), (Some(array), ""));

        set_link(&mut ws, by_element, holder, "Array.Array_i0", Vec::new()).unwrap();
        let stored = ws.property(by_element, props.linked_object).unwrap();
        assert_eq!((stored.object, stored.subname.as_str()), (Some(holder), "Array.0."));

        ws.extension::<LinkElement>(elements[0])
            .unwrap()
            .release_owner();
        assert_eq!(
            set_link(&mut ws, by_element, elements[0], "", Vec::new()),
            Err(DocumentError::OrphanElement(elements[0]))
        );
    }
}
