// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Shared METS/MODS test fixtures, shaped after a typical VLS-exported
// monograph with four pages, granular URNs and a two-entry logical
// structure.

/// Monograph with MODS descriptive section, MAX file group, physical
/// sequence with granular URNs, logical structure and struct links.
pub(crate) const METS_MONOGRAPH: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mets:mets xmlns:mets="http://www.loc.gov/METS/" xmlns:mods="http://www.loc.gov/mods/v3" xmlns:xlink="http://www.w3.org/1999/xlink">
  <mets:dmdSec ID="md737429">
    <mets:mdWrap MDTYPE="MODS">
      <mets:xmlData>
        <mods:mods>
          <mods:titleInfo>
            <mods:title>Ode In Solemni Panegyri Avgvstissimo Ac Potentissimo</mods:title>
          </mods:titleInfo>
          <mods:name type="personal">
            <mods:role>
              <mods:roleTerm type="code">aut</mods:roleTerm>
            </mods:role>
            <mods:displayForm>Brühl</mods:displayForm>
            <mods:namePart type="family">von Brühl</mods:namePart>
          </mods:name>
          <mods:originInfo eventType="publication">
            <mods:dateIssued>1731</mods:dateIssued>
          </mods:originInfo>
          <mods:identifier type="urn">urn:nbn:de:gbv:3:3-21437</mods:identifier>
          <mods:recordInfo>
            <mods:recordIdentifier source="gbv">191092622</mods:recordIdentifier>
          </mods:recordInfo>
        </mods:mods>
      </mets:xmlData>
    </mets:mdWrap>
  </mets:dmdSec>
  <mets:fileSec>
    <mets:fileGrp USE="MAX">
      <mets:file ID="MAX_737434" MIMETYPE="image/jpeg">
        <mets:FLocat LOCTYPE="URL" xlink:href="MAX/737434.jpg"/>
      </mets:file>
      <mets:file ID="MAX_737436" MIMETYPE="image/jpeg">
        <mets:FLocat LOCTYPE="URL" xlink:href="MAX/737436.jpg"/>
      </mets:file>
      <mets:file ID="MAX_737437" MIMETYPE="image/jpeg">
        <mets:FLocat LOCTYPE="URL" xlink:href="MAX/737437.jpg"/>
      </mets:file>
      <mets:file ID="MAX_737438" MIMETYPE="image/jpeg">
        <mets:FLocat LOCTYPE="URL" xlink:href="MAX/737438.jpg"/>
      </mets:file>
    </mets:fileGrp>
  </mets:fileSec>
  <mets:structMap TYPE="LOGICAL">
    <mets:div ID="log737429" TYPE="monograph" DMDID="md737429" LABEL="Ode In Solemni Panegyri Avgvstissimo Ac Potentissimo">
      <mets:div ID="log1" TYPE="title_page"/>
      <mets:div ID="log2" TYPE="section" LABEL="[Ode]"/>
    </mets:div>
  </mets:structMap>
  <mets:structMap TYPE="PHYSICAL">
    <mets:div ID="physroot" TYPE="physSequence">
      <mets:div ID="phys737434" TYPE="page" ORDER="1" ORDERLABEL="[Seite 1]" CONTENTIDS="urn:nbn:de:gbv:3:3-21437-p0001-0">
        <mets:fptr FILEID="MAX_737434"/>
      </mets:div>
      <mets:div ID="phys737436" TYPE="page" ORDER="2" ORDERLABEL="[Seite 2]" CONTENTIDS="urn:nbn:de:gbv:3:3-21437-p0002-2">
        <mets:fptr FILEID="MAX_737436"/>
      </mets:div>
      <mets:div ID="phys737437" TYPE="page" ORDER="3" ORDERLABEL="[Seite 3]" CONTENTIDS="urn:nbn:de:gbv:3:3-21437-p0003-4">
        <mets:fptr FILEID="MAX_737437"/>
      </mets:div>
      <mets:div ID="phys737438" TYPE="page" ORDER="4" ORDERLABEL="[Seite 4]" CONTENTIDS="urn:nbn:de:gbv:3:3-21437-p0004-6">
        <mets:fptr FILEID="MAX_737438"/>
      </mets:div>
    </mets:div>
  </mets:structMap>
  <mets:structLink>
    <mets:smLink xlink:from="log737429" xlink:to="physroot"/>
    <mets:smLink xlink:from="log1" xlink:to="phys737434"/>
    <mets:smLink xlink:from="log2" xlink:to="phys737436"/>
    <mets:smLink xlink:from="log2" xlink:to="phys737437"/>
    <mets:smLink xlink:from="log2" xlink:to="phys737438"/>
  </mets:structLink>
</mets:mets>
"#;

/// Multivolume work: the logical root carries no DMDID, the first volume
/// subdivision does. Includes a logical type outside the mapped
/// vocabulary, which the structure mapper must drop.
pub(crate) const METS_MULTIVOLUME: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mets:mets xmlns:mets="http://www.loc.gov/METS/" xmlns:mods="http://www.loc.gov/mods/v3" xmlns:xlink="http://www.w3.org/1999/xlink">
  <mets:dmdSec ID="mdvol1">
    <mets:mdWrap MDTYPE="MODS">
      <mets:xmlData>
        <mods:mods>
          <mods:titleInfo>
            <mods:title>Sammelwerk</mods:title>
          </mods:titleInfo>
          <mods:name type="personal">
            <mods:role>
              <mods:roleTerm type="code">pbl</mods:roleTerm>
            </mods:role>
            <mods:namePart type="family">Gebauer</mods:namePart>
          </mods:name>
          <mods:originInfo>
            <mods:dateIssued>1740</mods:dateIssued>
          </mods:originInfo>
          <mods:accessCondition>CC-BY-SA 3.0 DE</mods:accessCondition>
          <mods:recordInfo>
            <mods:recordIdentifier source="gbv">323633072</mods:recordIdentifier>
          </mods:recordInfo>
        </mods:mods>
      </mets:xmlData>
    </mets:mdWrap>
  </mets:dmdSec>
  <mets:fileSec>
    <mets:fileGrp USE="DEFAULT">
      <mets:file ID="DEF_0001">
        <mets:FLocat LOCTYPE="URL" xlink:href="DEFAULT/00000001.jpg"/>
      </mets:file>
      <mets:file ID="DEF_0002">
        <mets:FLocat LOCTYPE="URL" xlink:href="DEFAULT/00000002.jpg"/>
      </mets:file>
    </mets:fileGrp>
  </mets:fileSec>
  <mets:structMap TYPE="LOGICAL">
    <mets:div ID="logroot" TYPE="multivolume_work">
      <mets:div ID="logvol1" TYPE="volume" DMDID="mdvol1">
        <mets:div ID="logchap" TYPE="chapter"/>
        <mets:div ID="logbroken" TYPE="research_journal"/>
      </mets:div>
    </mets:div>
  </mets:structMap>
  <mets:structMap TYPE="PHYSICAL">
    <mets:div ID="physroot" TYPE="physSequence">
      <mets:div ID="phys1" TYPE="page" ORDER="1" ORDERLABEL="[Seite 1]">
        <mets:fptr FILEID="DEF_0001"/>
      </mets:div>
      <mets:div ID="phys2" TYPE="page" ORDER="2" ORDERLABEL="[Seite 2]">
        <mets:fptr FILEID="DEF_0002"/>
      </mets:div>
    </mets:div>
  </mets:structMap>
  <mets:structLink>
    <mets:smLink xlink:from="logroot" xlink:to="physroot"/>
    <mets:smLink xlink:from="logvol1" xlink:to="phys1"/>
    <mets:smLink xlink:from="logchap" xlink:to="phys2"/>
    <mets:smLink xlink:from="logbroken" xlink:to="phys2"/>
  </mets:structLink>
</mets:mets>
"#;
